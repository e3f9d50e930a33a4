use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// An immutable entry in the `ref_rewards` collection, one per settled
/// referral. The document is keyed by the referred user's identity, so a
/// second insert for the same user is rejected by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefReward {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "referrerId")]
    pub referrer_id: i64,
    pub reward: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
}

impl RefReward {
    pub fn new(user_id: i64, referrer_id: i64, reward: i64) -> Self {
        Self {
            id: user_id,
            user_id,
            referrer_id,
            reward,
            created_at: DateTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_keyed_by_referred_user() {
        let entry = RefReward::new(200, 100, 500);
        let doc = mongodb::bson::to_document(&entry).unwrap();
        assert_eq!(doc.get_i64("_id").unwrap(), 200);
        assert_eq!(doc.get_i64("userId").unwrap(), 200);
        assert_eq!(doc.get_i64("referrerId").unwrap(), 100);
        assert_eq!(doc.get_i64("reward").unwrap(), 500);
        assert!(doc.contains_key("createdAt"));
    }
}
