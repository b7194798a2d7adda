use std::sync::OnceLock;

use regex::Regex;

use crate::error::AppError;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Article ids come straight from the URL; anything below 1 cannot name a
/// published piece.
pub fn positive_id(id: i64) -> Result<i64, AppError> {
    if id < 1 {
        return Err(AppError::BadRequest(
            "Article id must be a positive integer".to_string(),
        ));
    }
    Ok(id)
}

/// Subscriptions are keyed case-insensitively on the stored form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    let re = EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
    re.is_match(email)
}
