//! Secret handling utilities.

pub use secrecy::{ExposeSecret, SecretString};

/// Database URL with the password masked, safe to log.
pub fn redacted_database_url(database_url: &SecretString) -> String {
    match url::Url::parse(database_url.expose_secret()) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("****"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}
