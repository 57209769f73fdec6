use thiserror::Error;

/// Errors produced while validating input or talking to GitHub and the LLM
/// providers.
///
/// Configuration variants are raised before any network call is made; the
/// remaining variants surface from upstream services. None of them are
/// retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReflectError {
    #[error("Invalid GitHub username format: '{0}'")]
    InvalidUsername(String),

    #[error("{0}")]
    InvalidDateMode(&'static str),

    #[error("Lookback must be a positive number of months and not exceed {max}, got {value}")]
    InvalidLookback { value: i64, max: u32 },

    #[error("Invalid {field} date format '{value}'. Use YYYY-MM-DD")]
    InvalidDateFormat { field: &'static str, value: String },

    #[error("Start date must be before or equal to end date")]
    StartAfterEnd,

    #[error("Since date must be in the past")]
    DateInFuture,

    #[error("{0}")]
    DateRangeExceeded(String),

    #[error("Cannot use both {include_flag} and {exclude_flag} simultaneously")]
    ConflictingFilters {
        include_flag: &'static str,
        exclude_flag: &'static str,
    },

    #[error("Invalid organization names: {}", .0.join(", "))]
    InvalidOrganizations(Vec<String>),

    #[error("Invalid repository names: {}", .0.join(", "))]
    InvalidRepositories(Vec<String>),

    #[error("Invalid provider '{provider}'. Valid providers are: {}", .valid.join(", "))]
    InvalidProvider {
        provider: String,
        valid: Vec<&'static str>,
    },

    #[error("{0} environment variable is required")]
    MissingCredential(&'static str),

    #[error("GitHub API rate limit exceeded. Resets at {resets_at}")]
    RateLimitExceeded { resets_at: String },

    #[error("{0}")]
    Upstream(String),

    #[error("Invalid output filename: {0}")]
    InvalidOutputFile(String),
}

impl ReflectError {
    /// True for errors caused by bad or missing command-line input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReflectError::InvalidUsername(_)
                | ReflectError::InvalidDateMode(_)
                | ReflectError::InvalidLookback { .. }
                | ReflectError::InvalidDateFormat { .. }
                | ReflectError::StartAfterEnd
                | ReflectError::DateInFuture
                | ReflectError::DateRangeExceeded(_)
                | ReflectError::ConflictingFilters { .. }
                | ReflectError::InvalidOrganizations(_)
                | ReflectError::InvalidRepositories(_)
                | ReflectError::InvalidProvider { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReflectError>;
