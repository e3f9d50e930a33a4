use serde::{Deserialize, Serialize};

/// A user document in the `users` collection, keyed by the numeric
/// messaging-platform identity. Field names follow the store schema the
/// web frontend reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub coins: i64,
    pub reffer: i64,
    #[serde(rename = "refferBy")]
    pub reffer_by: Option<i64>,
    #[serde(rename = "tasksCompleted")]
    pub tasks_completed: i64,
    #[serde(rename = "totalWithdrawals")]
    pub total_withdrawals: i64,
    #[serde(rename = "frontendOpened")]
    pub frontend_opened: bool,
    #[serde(rename = "rewardGiven")]
    pub reward_given: bool,
}

impl User {
    /// A fresh record as written at first contact.
    pub fn new(id: i64, name: String, photo_url: String, reffer_by: Option<i64>) -> Self {
        Self {
            id,
            name,
            photo_url,
            coins: 0,
            reffer: 0,
            reffer_by,
            tasks_completed: 0,
            total_withdrawals: 0,
            frontend_opened: false,
            reward_given: false,
        }
    }
}
