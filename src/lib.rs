//! Reflect: GitHub activity reports and brag documents.
//!
//! Collects a user's merged pull requests, closed issues and pull request
//! reviews over a date range through the GitHub GraphQL search API,
//! renders them as Markdown reports and can condense them into a summary
//! and brag document with an LLM provider.

pub mod cli;
pub mod dates;
pub mod display;
pub mod error;
pub mod filter;
pub mod github;
pub mod graphql;
pub mod llm;
pub mod output;
pub mod query;
pub mod report;
pub mod run;
pub mod types;

pub use cli::{Config, debug_from_env, parse_args, parse_args_at};
pub use dates::{DateMode, DateRange, MAX_DATE_RANGE_MONTHS};
pub use error::{ReflectError, Result};
pub use filter::{FilterAxis, FilterSpec, build_filter};
pub use github::{Forge, GitHub};
pub use graphql::{CommentFilter, QueryKind};
pub use llm::LlmClient;
pub use output::{ConfirmOverwrite, OutputDir, StdinConfirm};
pub use query::{FetchRequest, fetch_contributions};
pub use run::{prepare_llm, run};
pub use types::{
    Comment, Contribution, ContributionKind, Contributions, LlmOptions, LlmProvider, Review,
};
