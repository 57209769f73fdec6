use chrono::{DateTime, Utc};

/// Whether a contribution was a pull request or an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionKind {
    PullRequest,
    Issue,
}

impl ContributionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContributionKind::PullRequest => "Pull Request",
            ContributionKind::Issue => "Issue",
        }
    }
}

/// A comment left by the user on a pull request or inside a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub body: String,
}

/// A review the user submitted, with the inline comments it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub author: String,
    pub state: String,
    pub body: String,
    pub comments: Vec<Comment>,
}

/// A merged pull request, closed issue or reviewed pull request, normalized
/// from whichever search produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub title: String,
    pub body: String,
    pub url: String,
    /// Only set for reviewed pull requests.
    pub permalink: Option<String>,
    pub closed_at: DateTime<Utc>,
    /// `owner/name`.
    pub repository: String,
    pub kind: ContributionKind,
    pub comments: Vec<Comment>,
    pub reviews: Vec<Review>,
}

/// Everything fetched for one invocation, grouped by search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contributions {
    pub prs: Vec<Contribution>,
    pub issues: Vec<Contribution>,
    pub reviews: Vec<Contribution>,
}

/// LLM backends that can turn the report into a summary and brag document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 2] = [LlmProvider::OpenAi, LlmProvider::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == name)
    }

    pub fn valid_names() -> Vec<&'static str> {
        Self::ALL.iter().map(LlmProvider::as_str).collect()
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4.1",
            LlmProvider::Anthropic => "claude-sonnet-4-6",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn base_url_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_BASE_URL",
            LlmProvider::Anthropic => "ANTHROPIC_BASE_URL",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1/",
            LlmProvider::Anthropic => "https://api.anthropic.com/",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which provider and model to use for document generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmOptions {
    pub provider: LlmProvider,
    pub model: Option<String>,
}

impl LlmOptions {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}
