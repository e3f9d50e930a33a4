pub mod memory;
pub mod mongo;

use axum::async_trait;
use thiserror::Error;

use crate::models::{RefReward, User};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("document encoding error: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),
    #[error("referrer {0} not found")]
    ReferrerMissing(i64),
    #[error("user {0} not found")]
    UserMissing(i64),
}

/// Outcome of a ledger insert. `AlreadyRecorded` is the already-settled
/// signal, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerInsert {
    Created,
    AlreadyRecorded,
}

/// What the service requires of a storage backend: create-or-skip-if-exists
/// writes (`ensure_user`, `record_reward`) and an atomic numeric increment
/// (`credit_referrer`), plus the reads and flag updates around them.
#[async_trait]
pub trait RewardStore: Send + Sync {
    /// Insert the record if no document exists for its identity. Existing
    /// fields are never overwritten.
    async fn ensure_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Set `frontendOpened` on the record. Returns false when no such user
    /// exists.
    async fn set_frontend_opened(&self, id: i64) -> Result<bool, StoreError>;

    /// Commutative store-side increment of the referrer's balance and
    /// referral count.
    async fn credit_referrer(&self, referrer_id: i64, amount: i64) -> Result<(), StoreError>;

    async fn mark_reward_given(&self, user_id: i64) -> Result<(), StoreError>;

    /// Append the ledger entry unless one already exists for the referred
    /// user.
    async fn record_reward(&self, entry: &RefReward) -> Result<LedgerInsert, StoreError>;

    /// Users satisfying `frontendOpened && !rewardGiven` with a referrer,
    /// for the reconciliation sweep.
    async fn eligible_users(&self) -> Result<Vec<User>, StoreError>;
}
