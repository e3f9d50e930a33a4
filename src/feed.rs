use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc::UnboundedSender;
use mongodb::Collection;
use mongodb::bson::doc;
use mongodb::change_stream::event::OperationType;
use mongodb::options::{ChangeStreamOptions, FullDocumentType};

use crate::models::User;
use crate::store::RewardStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Follow the `users` change stream and forward every record that hits the
/// eligible condition. Reopens the stream after errors.
pub async fn watch_users(users: Collection<User>, tx: UnboundedSender<User>) {
    let pipeline = [doc! {
        "$match": {
            "fullDocument.frontendOpened": true,
            "fullDocument.rewardGiven": false,
        }
    }];

    loop {
        let options = ChangeStreamOptions::builder()
            .full_document(Some(FullDocumentType::UpdateLookup))
            .build();
        let mut stream = match users.watch(pipeline.clone(), options).await {
            Ok(stream) => stream,
            Err(err) => {
                eprintln!("User change stream failed to open: {}", err);
                tokio::time::sleep(RESUBSCRIBE_DELAY).await;
                continue;
            }
        };

        while let Some(event) = stream.next().await {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    eprintln!("User change stream error: {}", err);
                    break;
                }
            };
            let changed = matches!(
                event.operation_type,
                OperationType::Insert | OperationType::Update | OperationType::Replace
            );
            if !changed {
                continue;
            }
            if let Some(user) = event.full_document {
                if tx.unbounded_send(user).is_err() {
                    return;
                }
            }
        }

        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    }
}

/// Periodically re-query the eligible set and replay it into the engine.
/// Covers changes missed while the process was down and settlements that
/// failed transiently. The first pass runs at startup.
pub async fn sweep_eligible<S: RewardStore>(store: Arc<S>, tx: UnboundedSender<User>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        match store.eligible_users().await {
            Ok(users) => {
                for user in users {
                    if tx.unbounded_send(user).is_err() {
                        return;
                    }
                }
            }
            Err(err) => eprintln!("Eligibility sweep failed: {}", err),
        }
    }
}
