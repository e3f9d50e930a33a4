use crate::models::User;
use crate::store::{RewardStore, StoreError};

/// Recognized referral token form: `ref<numeric identity>`.
const REF_PREFIX: &str = "ref";

/// What the bot glue hands over from a `/start` command.
#[derive(Debug, Clone)]
pub struct StartProfile {
    pub id: i64,
    pub first_name: String,
    pub photo_url: Option<String>,
    pub ref_param: Option<String>,
}

/// Derive the referrer identity from a start parameter. Tokens that do not
/// match the recognized form are ignored, and self-referral yields no
/// referrer.
pub fn parse_referral(param: Option<&str>, user_id: i64) -> Option<i64> {
    let token = param?.strip_prefix(REF_PREFIX)?;
    let referrer_id = token.parse::<i64>().ok()?;
    if referrer_id == user_id {
        return None;
    }
    Some(referrer_id)
}

/// Ensure a record exists for the arriving user and return the stored
/// document. Re-contact never mutates existing fields.
pub async fn onboard<S>(store: &S, profile: &StartProfile) -> Result<User, StoreError>
where
    S: RewardStore + ?Sized,
{
    let reffer_by = parse_referral(profile.ref_param.as_deref(), profile.id);
    let record = User::new(
        profile.id,
        profile.first_name.clone(),
        profile.photo_url.clone().unwrap_or_default(),
        reffer_by,
    );
    store.ensure_user(&record).await?;

    match store.find_user(profile.id).await? {
        Some(user) => Ok(user),
        None => Ok(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn referral_token_yields_referrer() {
        assert_eq!(parse_referral(Some("ref100"), 200), Some(100));
    }

    #[test]
    fn self_referral_yields_no_referrer() {
        assert_eq!(parse_referral(Some("ref100"), 100), None);
    }

    #[test]
    fn unrecognized_tokens_yield_no_referrer() {
        assert_eq!(parse_referral(None, 200), None);
        assert_eq!(parse_referral(Some(""), 200), None);
        assert_eq!(parse_referral(Some("100"), 200), None);
        assert_eq!(parse_referral(Some("ref"), 200), None);
        assert_eq!(parse_referral(Some("refabc"), 200), None);
        assert_eq!(parse_referral(Some("REF100"), 200), None);
    }

    #[tokio::test]
    async fn onboarding_is_idempotent_per_identity() {
        let store = MemoryStore::new();
        let first = StartProfile {
            id: 200,
            first_name: "Bea".to_string(),
            photo_url: Some("https://example.com/p.jpg".to_string()),
            ref_param: Some("ref100".to_string()),
        };
        let created = onboard(&store, &first).await.unwrap();
        assert_eq!(created.reffer_by, Some(100));
        assert_eq!(created.coins, 0);

        // Same identity arriving again, this time organically.
        let again = StartProfile {
            id: 200,
            first_name: "Renamed".to_string(),
            photo_url: None,
            ref_param: None,
        };
        let kept = onboard(&store, &again).await.unwrap();
        assert_eq!(kept.name, "Bea");
        assert_eq!(kept.photo_url, "https://example.com/p.jpg");
        assert_eq!(kept.reffer_by, Some(100));
    }
}
