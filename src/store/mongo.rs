use axum::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};

use super::{LedgerInsert, RewardStore, StoreError};
use crate::models::{RefReward, User};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
    rewards: Collection<RefReward>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
            rewards: db.collection("ref_rewards"),
        }
    }

    /// Handle on the `users` collection for the change-stream watcher.
    pub fn users(&self) -> Collection<User> {
        self.users.clone()
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl RewardStore for MongoStore {
    async fn ensure_user(&self, user: &User) -> Result<(), StoreError> {
        let mut defaults = to_document(user)?;
        // The filter supplies _id on insert; $setOnInsert must not touch it.
        defaults.remove("_id");
        self.users
            .update_one(
                doc! { "_id": user.id },
                doc! { "$setOnInsert": defaults },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn set_frontend_opened(&self, id: i64) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "frontendOpened": true } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn credit_referrer(&self, referrer_id: i64, amount: i64) -> Result<(), StoreError> {
        let result = self
            .users
            .update_one(
                doc! { "_id": referrer_id },
                doc! { "$inc": { "coins": amount, "reffer": 1_i64 } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::ReferrerMissing(referrer_id));
        }
        Ok(())
    }

    async fn mark_reward_given(&self, user_id: i64) -> Result<(), StoreError> {
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "rewardGiven": true } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::UserMissing(user_id));
        }
        Ok(())
    }

    async fn record_reward(&self, entry: &RefReward) -> Result<LedgerInsert, StoreError> {
        match self.rewards.insert_one(entry, None).await {
            Ok(_) => Ok(LedgerInsert::Created),
            Err(err) if is_duplicate_key(&err) => Ok(LedgerInsert::AlreadyRecorded),
            Err(err) => Err(err.into()),
        }
    }

    async fn eligible_users(&self) -> Result<Vec<User>, StoreError> {
        let mut cursor = self
            .users
            .find(
                doc! {
                    "frontendOpened": true,
                    "rewardGiven": false,
                    "refferBy": { "$ne": null },
                },
                None,
            )
            .await?;

        let mut eligible = Vec::new();
        while let Some(user) = cursor.try_next().await? {
            eligible.push(user);
        }
        Ok(eligible)
    }
}
