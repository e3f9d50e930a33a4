mod db;
mod feed;
mod models;
mod onboarding;
mod routes;
mod settlement;
mod store;

use crate::db::connect_to_mongo;
use crate::feed::{sweep_eligible, watch_users};
use crate::routes::users::user_routes;
use crate::settlement::SettlementEngine;
use crate::store::MongoStore;

use axum::{Router, response::Html, routing::get};
use dioxus::prelude::*;
use dioxus_core::NoOpMutations;

use futures::channel::mpsc;
use std::sync::Arc;
use tokio::net::TcpListener;

fn app() -> Element {
    rsx! {
        head {
            title { "Referral Reward Bot" }
        }
        body {
            div { "Bot is running..." }
        }
    }
}

async fn home() -> Html<String> {
    let mut renderer = dioxus_ssr::Renderer::new();
    let mut buffer = String::new();
    let mut vdom = VirtualDom::new(app);
    let mut mutations = NoOpMutations;
    vdom.rebuild(&mut mutations);
    renderer.render_to(&mut buffer, &vdom).unwrap();
    Html(format!("<!DOCTYPE html><html>{}</html>", buffer))
}

#[derive(Clone)]
struct AppState {
    store: Arc<MongoStore>,
}

#[tokio::main]
async fn main() {
    let db = connect_to_mongo()
        .await
        .expect("Failed to connect to MongoDB");
    println!("Successfully connected to MongoDB!");

    let store = Arc::new(MongoStore::new(&db));

    // Change feed and reconciliation sweep both feed the one engine stream.
    let (tx, rx) = mpsc::unbounded();
    tokio::spawn(watch_users(store.users(), tx.clone()));
    tokio::spawn(sweep_eligible(store.clone(), tx));

    let engine = SettlementEngine::new(store.clone());
    tokio::spawn(async move { engine.run(rx).await });

    let state = AppState { store };

    let api_router = Router::new().merge(user_routes());

    let app = Router::new()
        .route("/", get(home))
        .nest("/api", api_router)
        .with_state(state);

    let addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await.unwrap();
    println!("Backend worker and bot are online on {}", addr);
    axum::serve(listener, app).await.unwrap();
}
