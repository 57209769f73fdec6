use async_trait::async_trait;
use chrono::{DateTime, Local};
use chrono_humanize::HumanTime;
use octocrab::Octocrab;
use tracing::debug;

use crate::error::{ReflectError, Result};

/// A GraphQL endpoint that answers GitHub search queries.
///
/// Implementations return the full response document, `data` and `errors`
/// included, so callers can classify failures reported inside a successful
/// HTTP response.
#[async_trait]
pub trait Forge {
    async fn graphql(&self, body: &serde_json::Value) -> Result<serde_json::Value>;
}

/// The real GitHub GraphQL API.
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    /// Creates a client authenticated with the token from the environment.
    pub fn from_env() -> Result<Self> {
        Self::with_token(get_github_token()?)
    }

    pub fn with_token(token: String) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| ReflectError::Upstream(format!("Failed to create GitHub client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn graphql(&self, body: &serde_json::Value) -> Result<serde_json::Value> {
        debug!("sending GitHub GraphQL request");
        self.client
            .graphql::<serde_json::Value>(body)
            .await
            .map_err(convert_octocrab_error)
    }
}

/// Reads the GitHub token from `GITHUB_TOKEN`, falling back to `GH_TOKEN`.
pub fn get_github_token() -> Result<String> {
    ["GITHUB_TOKEN", "GH_TOKEN"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .ok_or(ReflectError::MissingCredential("GITHUB_TOKEN"))
}

fn convert_octocrab_error(error: octocrab::Error) -> ReflectError {
    match &error {
        octocrab::Error::GitHub { source, .. } => {
            if source.message.to_lowercase().contains("rate limit exceeded") {
                ReflectError::RateLimitExceeded {
                    resets_at: "an unknown time".to_string(),
                }
            } else {
                ReflectError::Upstream(format!("GitHub API error: {}", source.message))
            }
        }
        _ => ReflectError::Upstream(format!("GitHub API error: {error}")),
    }
}

/// Formats a rate-limit reset instant (epoch seconds) as local wall-clock
/// time with a relative hint, e.g. `14:05:00 (in 12 minutes)`.
pub fn format_reset_time(reset_epoch_secs: i64) -> String {
    match DateTime::from_timestamp(reset_epoch_secs, 0) {
        Some(reset) => format!(
            "{} ({})",
            reset.with_timezone(&Local).format("%H:%M:%S"),
            HumanTime::from(reset)
        ),
        None => "an unknown time".to_string(),
    }
}
