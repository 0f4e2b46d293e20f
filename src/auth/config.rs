use crate::auth::{AuthError, AuthResult};

const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 10 * 24 * 60 * 60;
/// Upper bound for either token lifetime.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Authentication configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub access_cookie_name: String,
    pub refresh_cookie_name: String,
    pub cookie_domain: Option<String>,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_token_secret = required_secret(&lookup, "ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required_secret(&lookup, "REFRESH_TOKEN_SECRET")?;
        if access_token_secret == refresh_token_secret {
            return Err(AuthError::Config(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".into(),
            ));
        }

        let access_token_ttl_secs =
            ttl_secs(&lookup, "ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?;
        let refresh_token_ttl_secs =
            ttl_secs(&lookup, "REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS)?;
        let access_cookie_name =
            lookup("ACCESS_COOKIE_NAME").unwrap_or_else(|| "accessToken".into());
        let refresh_cookie_name =
            lookup("REFRESH_COOKIE_NAME").unwrap_or_else(|| "refreshToken".into());
        let cookie_domain = lookup("COOKIE_DOMAIN").filter(|value| !value.trim().is_empty());

        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            access_cookie_name,
            refresh_cookie_name,
            cookie_domain,
        })
    }
}

fn required_secret<F>(lookup: &F, key: &str) -> AuthResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::Config(format!("{key} is required"))),
    }
}

/// Unset falls back to `default`; anything other than 1..=MAX_TOKEN_TTL_SECS is rejected.
fn ttl_secs<F>(lookup: &F, key: &str, default: i64) -> AuthResult<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(secs) if (1..=MAX_TOKEN_TTL_SECS).contains(&secs) => Ok(secs),
        _ => Err(AuthError::Config(format!(
            "{key} must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"
        ))),
    }
}
