use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::models::{RefReward, User};
use crate::store::{LedgerInsert, RewardStore, StoreError};

pub const REWARD_AMOUNT: i64 = 500;

/// Result of one settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The ledger entry was created, the referrer credited, and the record
    /// marked settled.
    Credited { referrer_id: i64 },
    /// A ledger entry already existed for this user; the reward flag was
    /// repaired if needed, without crediting again.
    AlreadySettled,
    /// The record is not in the eligible state.
    NotEligible,
}

/// Drives the `ELIGIBLE -> SETTLED` transition for referred users. The
/// engine only sees a stream of changed records; where they come from
/// (change feed, reconciliation sweep) is the caller's business.
pub struct SettlementEngine<S> {
    store: Arc<S>,
}

impl<S: RewardStore> SettlementEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Settle one observed record. Safe to call any number of times for the
    /// same user: the ledger insert is the idempotency guard, so at most one
    /// call ever reaches the credit step.
    pub async fn settle(&self, user: &User) -> Result<Settlement, StoreError> {
        if !user.frontend_opened || user.reward_given {
            return Ok(Settlement::NotEligible);
        }
        // The feed filters on these upstream; re-check before any write.
        let referrer_id = match user.reffer_by {
            Some(id) if id != user.id => id,
            _ => return Ok(Settlement::NotEligible),
        };

        let entry = RefReward::new(user.id, referrer_id, REWARD_AMOUNT);
        match self.store.record_reward(&entry).await? {
            LedgerInsert::AlreadyRecorded => {
                // Settlement already happened; only the flag can be behind.
                self.store.mark_reward_given(user.id).await?;
                Ok(Settlement::AlreadySettled)
            }
            LedgerInsert::Created => {
                self.store
                    .credit_referrer(referrer_id, REWARD_AMOUNT)
                    .await?;
                self.store.mark_reward_given(user.id).await?;
                Ok(Settlement::Credited { referrer_id })
            }
        }
    }

    /// Drain a stream of changed records, settling each one. A failure for
    /// one user is logged and never stops the stream; the record stays
    /// eligible and is retried by the next sweep.
    pub async fn run(&self, mut changes: impl Stream<Item = User> + Unpin) {
        while let Some(user) = changes.next().await {
            match self.settle(&user).await {
                Ok(Settlement::Credited { referrer_id }) => {
                    println!("Reward given to {} for inviting {}", referrer_id, user.id);
                }
                Ok(Settlement::AlreadySettled) => {
                    println!("Referral for user {} already settled", user.id);
                }
                Ok(Settlement::NotEligible) => {}
                Err(err) => {
                    eprintln!("Referral reward error for user {}: {}", user.id, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn seed_pair(store: &MemoryStore) {
        // A (100) invited B (200); B has opened the frontend.
        let referrer = User::new(100, "Ari".to_string(), String::new(), None);
        store.ensure_user(&referrer).await.unwrap();
        let mut referred = User::new(200, "Bea".to_string(), String::new(), Some(100));
        referred.frontend_opened = true;
        store.ensure_user(&referred).await.unwrap();
    }

    #[tokio::test]
    async fn settles_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        seed_pair(&store).await;
        let engine = SettlementEngine::new(store.clone());

        let referred = store.find_user(200).await.unwrap().unwrap();
        let outcome = engine.settle(&referred).await.unwrap();
        assert_eq!(outcome, Settlement::Credited { referrer_id: 100 });

        let referrer = store.find_user(100).await.unwrap().unwrap();
        assert_eq!(referrer.coins, 500);
        assert_eq!(referrer.reffer, 1);

        let referred = store.find_user(200).await.unwrap().unwrap();
        assert!(referred.reward_given);

        let entry = store.reward_entry(200).unwrap();
        assert_eq!(entry.user_id, 200);
        assert_eq!(entry.referrer_id, 100);
        assert_eq!(entry.reward, 500);

        // The record left the eligible set.
        assert!(store.eligible_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reobserved_eligibility_does_not_credit_twice() {
        let store = Arc::new(MemoryStore::new());
        seed_pair(&store).await;
        let engine = SettlementEngine::new(store.clone());

        let referred = store.find_user(200).await.unwrap().unwrap();
        engine.settle(&referred).await.unwrap();

        // A stale notification re-delivers the pre-settlement record.
        let outcome = engine.settle(&referred).await.unwrap();
        assert_eq!(outcome, Settlement::AlreadySettled);

        let referrer = store.find_user(100).await.unwrap().unwrap();
        assert_eq!(referrer.coins, 500);
        assert_eq!(referrer.reffer, 1);
        assert_eq!(store.reward_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_triggers_credit_once() {
        let store = Arc::new(MemoryStore::new());
        seed_pair(&store).await;
        let engine = Arc::new(SettlementEngine::new(store.clone()));

        let referred = store.find_user(200).await.unwrap().unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let user = referred.clone();
            handles.push(tokio::spawn(async move { engine.settle(&user).await }));
        }

        let mut credited = 0;
        for handle in handles {
            if let Settlement::Credited { .. } = handle.await.unwrap().unwrap() {
                credited += 1;
            }
        }
        assert_eq!(credited, 1);

        let referrer = store.find_user(100).await.unwrap().unwrap();
        assert_eq!(referrer.coins, 500);
        assert_eq!(referrer.reffer, 1);
        assert_eq!(store.reward_count(), 1);
    }

    #[tokio::test]
    async fn users_without_referrer_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let mut organic = User::new(300, "Org".to_string(), String::new(), None);
        organic.frontend_opened = true;
        store.ensure_user(&organic).await.unwrap();

        let engine = SettlementEngine::new(store.clone());
        let outcome = engine.settle(&organic).await.unwrap();
        assert_eq!(outcome, Settlement::NotEligible);
        assert_eq!(store.reward_count(), 0);
    }

    #[tokio::test]
    async fn self_referral_never_credits() {
        let store = Arc::new(MemoryStore::new());
        let mut own = User::new(300, "Own".to_string(), String::new(), Some(300));
        own.frontend_opened = true;
        store.ensure_user(&own).await.unwrap();

        let engine = SettlementEngine::new(store.clone());
        let outcome = engine.settle(&own).await.unwrap();
        assert_eq!(outcome, Settlement::NotEligible);
        assert_eq!(store.reward_count(), 0);
    }

    #[tokio::test]
    async fn unopened_records_are_not_candidates() {
        let store = Arc::new(MemoryStore::new());
        seed_pair(&store).await;
        let engine = SettlementEngine::new(store.clone());

        let mut referred = store.find_user(200).await.unwrap().unwrap();
        referred.frontend_opened = false;
        let outcome = engine.settle(&referred).await.unwrap();
        assert_eq!(outcome, Settlement::NotEligible);
    }

    #[tokio::test]
    async fn existing_ledger_entry_repairs_flag_without_credit() {
        let store = Arc::new(MemoryStore::new());
        seed_pair(&store).await;

        // A previous run recorded the ledger entry but crashed before the
        // flag write.
        store
            .record_reward(&RefReward::new(200, 100, REWARD_AMOUNT))
            .await
            .unwrap();

        let engine = SettlementEngine::new(store.clone());
        let referred = store.find_user(200).await.unwrap().unwrap();
        let outcome = engine.settle(&referred).await.unwrap();
        assert_eq!(outcome, Settlement::AlreadySettled);

        let referred = store.find_user(200).await.unwrap().unwrap();
        assert!(referred.reward_given);
        let referrer = store.find_user(100).await.unwrap().unwrap();
        assert_eq!(referrer.coins, 0);
        assert_eq!(referrer.reffer, 0);
    }

    #[tokio::test]
    async fn run_keeps_draining_after_a_failed_settlement() {
        let store = Arc::new(MemoryStore::new());
        seed_pair(&store).await;

        // Referred user whose referrer record does not exist; crediting it
        // fails.
        let mut broken = User::new(400, "Broke".to_string(), String::new(), Some(999));
        broken.frontend_opened = true;
        store.ensure_user(&broken).await.unwrap();

        let engine = SettlementEngine::new(store.clone());
        let good = store.find_user(200).await.unwrap().unwrap();
        let changes = futures::stream::iter(vec![broken, good]);
        engine.run(changes).await;

        let referrer = store.find_user(100).await.unwrap().unwrap();
        assert_eq!(referrer.coins, 500);
        assert_eq!(referrer.reffer, 1);
    }
}
