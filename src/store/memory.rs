use std::collections::BTreeMap;
use std::sync::Mutex;

use axum::async_trait;

use super::{LedgerInsert, RewardStore, StoreError};
use crate::models::{RefReward, User};

/// Map-backed store with the same capability semantics as the Mongo
/// backend. Backs the engine tests; any compliant backend works.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    rewards: BTreeMap<i64, RefReward>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reward_entry(&self, user_id: i64) -> Option<RefReward> {
        self.inner.lock().unwrap().rewards.get(&user_id).cloned()
    }

    pub fn reward_count(&self) -> usize {
        self.inner.lock().unwrap().rewards.len()
    }
}

#[async_trait]
impl RewardStore for MemoryStore {
    async fn ensure_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.entry(user.id).or_insert_with(|| user.clone());
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn set_frontend_opened(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.frontend_opened = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn credit_referrer(&self, referrer_id: i64, amount: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let referrer = inner
            .users
            .get_mut(&referrer_id)
            .ok_or(StoreError::ReferrerMissing(referrer_id))?;
        referrer.coins += amount;
        referrer.reffer += 1;
        Ok(())
    }

    async fn mark_reward_given(&self, user_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserMissing(user_id))?;
        user.reward_given = true;
        Ok(())
    }

    async fn record_reward(&self, entry: &RefReward) -> Result<LedgerInsert, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.rewards.contains_key(&entry.id) {
            return Ok(LedgerInsert::AlreadyRecorded);
        }
        inner.rewards.insert(entry.id, entry.clone());
        Ok(LedgerInsert::Created)
    }

    async fn eligible_users(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .values()
            .filter(|u| u.frontend_opened && !u.reward_given && u.reffer_by.is_some())
            .cloned()
            .collect())
    }
}
