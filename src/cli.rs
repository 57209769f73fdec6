use chrono::{DateTime, Utc};
use clap::Parser;

use crate::{
    dates::{DateMode, DateRange},
    error::{ReflectError, Result},
    filter::{FilterAxis, FilterSpec, is_valid_account_name},
    graphql::CommentFilter,
    query::FetchRequest,
    types::{LlmOptions, LlmProvider},
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

const AFTER_HELP: &str = "\
Set GITHUB_TOKEN for GitHub access, and OPENAI_API_KEY or ANTHROPIC_API_KEY for --brag.
Variables may also be placed in a .env file in the working directory.

Date range options (mutually exclusive):
  --lookback <MONTHS>                                 Look back N months from today
  --since <YYYY-MM-DD>                                From this date to today
  --start-date <YYYY-MM-DD> --end-date <YYYY-MM-DD>   Exact date range

Examples:
  reflect --username octocat --lookback 6 --brag
  reflect --username octocat --since 2025-01-01
  reflect --username octocat --start-date 2025-01-01 --end-date 2025-06-30
  reflect --username octocat --lookback 6 --include-orgs acme
  reflect --username octocat --lookback 6 --exclude-repos acme/secret";

#[derive(Parser, Default, Debug)]
#[command(name = "reflect", version)]
#[command(about = "Generate GitHub activity reports and brag documents")]
#[command(long_version = BUILD_INFO_HUMAN, after_help = AFTER_HELP)]
struct CliArgs {
    /// GitHub username to analyze
    #[arg(long, value_name = "USERNAME")]
    pub username: String,

    /// Number of months to look back from today
    #[arg(
        long,
        value_name = "MONTHS",
        allow_negative_numbers = true,
        help_heading = "Date range"
    )]
    pub lookback: Option<i64>,

    /// Start date, fetching activity from this date to today
    #[arg(long, value_name = "YYYY-MM-DD", help_heading = "Date range")]
    pub since: Option<String>,

    /// Start of an explicit date range
    #[arg(long = "start-date", value_name = "YYYY-MM-DD", help_heading = "Date range")]
    pub start_date: Option<String>,

    /// End of an explicit date range (inclusive)
    #[arg(long = "end-date", value_name = "YYYY-MM-DD", help_heading = "Date range")]
    pub end_date: Option<String>,

    /// Only include contributions to these organizations
    #[arg(long = "include-orgs", num_args = 1.., value_name = "ORG", help_heading = "Filters")]
    pub include_orgs: Vec<String>,

    /// Exclude contributions to these organizations
    #[arg(long = "exclude-orgs", num_args = 1.., value_name = "ORG", help_heading = "Filters")]
    pub exclude_orgs: Vec<String>,

    /// Only include contributions to these repositories
    #[arg(
        long = "include-repos",
        num_args = 1..,
        value_name = "OWNER/REPO",
        help_heading = "Filters"
    )]
    pub include_repos: Vec<String>,

    /// Exclude contributions to these repositories
    #[arg(
        long = "exclude-repos",
        num_args = 1..,
        value_name = "OWNER/REPO",
        help_heading = "Filters"
    )]
    pub exclude_repos: Vec<String>,

    /// Skip reviewed-PR comments starting with this text (can specify multiple)
    #[arg(long = "skip-comment-prefix", value_name = "PREFIX", help_heading = "Filters")]
    pub skip_comment_prefix: Vec<String>,

    /// Generate a summary and brag document with an LLM
    #[arg(long)]
    pub brag: bool,

    /// LLM provider to use
    #[arg(long, default_value = "openai", value_name = "PROVIDER")]
    pub provider: String,

    /// LLM model to use (defaults to gpt-4.1 for openai, claude-sonnet-4-6 for anthropic)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Overwrite existing output files without asking
    #[arg(long)]
    pub force: bool,

    /// Enable debug logging (also enabled by DEBUG=1)
    #[arg(long)]
    pub debug: bool,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub date_mode: DateMode,
    pub date_range: DateRange,
    pub org_filter: FilterSpec,
    pub repo_filter: FilterSpec,
    pub skip_comment_prefixes: Vec<String>,
    pub generate_brag: bool,
    pub llm: LlmOptions,
    pub force: bool,
    pub debug: bool,
}

impl Config {
    /// The aggregator request derived from this configuration.
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            username: self.username.clone(),
            date_range: self.date_range,
            org_filter: self.org_filter.clone(),
            repo_filter: self.repo_filter.clone(),
            comment_filter: CommentFilter::new(&self.username)
                .with_skip_prefixes(self.skip_comment_prefixes.iter().cloned()),
            debug: self.debug,
        }
    }
}

impl CliArgs {
    /// Runs the validation pipeline, stopping at the first failure.
    fn into_config(self, now: DateTime<Utc>) -> Result<Config> {
        validate_username(&self.username)?;

        let date_mode = DateMode::from_flags(
            self.lookback,
            self.since.as_deref(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )?;
        let date_range = date_mode.resolve(now)?;

        let org_filter = FilterSpec::new(self.include_orgs, self.exclude_orgs);
        validate_filter(FilterAxis::Organization, &org_filter)?;

        let repo_filter = FilterSpec::new(self.include_repos, self.exclude_repos);
        validate_filter(FilterAxis::Repository, &repo_filter)?;

        let provider = validate_provider(&self.provider)?;

        Ok(Config {
            username: self.username,
            date_mode,
            date_range,
            org_filter,
            repo_filter,
            skip_comment_prefixes: self.skip_comment_prefix,
            generate_brag: self.brag,
            llm: LlmOptions {
                provider,
                model: self.model.filter(|model| !model.trim().is_empty()),
            },
            force: self.force,
            debug: self.debug,
        })
    }
}

fn validate_username(username: &str) -> Result<()> {
    if is_valid_account_name(username) {
        Ok(())
    } else {
        Err(ReflectError::InvalidUsername(username.to_string()))
    }
}

fn non_blank(names: &[String]) -> impl Iterator<Item = &str> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
}

/// Rejects include/exclude conflicts and malformed names on one axis.
/// Invalid names are reported together, once each, in the order given.
pub fn validate_filter(axis: FilterAxis, lists: &FilterSpec) -> Result<()> {
    if non_blank(&lists.include).next().is_some() && non_blank(&lists.exclude).next().is_some() {
        return Err(ReflectError::ConflictingFilters {
            include_flag: axis.include_flag(),
            exclude_flag: axis.exclude_flag(),
        });
    }

    let mut invalid: Vec<String> = Vec::new();
    for name in non_blank(&lists.include).chain(non_blank(&lists.exclude)) {
        if !axis.is_valid_name(name) && !invalid.iter().any(|seen| seen == name) {
            invalid.push(name.to_string());
        }
    }

    if invalid.is_empty() {
        return Ok(());
    }

    Err(match axis {
        FilterAxis::Organization => ReflectError::InvalidOrganizations(invalid),
        FilterAxis::Repository => ReflectError::InvalidRepositories(invalid),
    })
}

fn validate_provider(name: &str) -> Result<LlmProvider> {
    LlmProvider::from_name(name).ok_or_else(|| ReflectError::InvalidProvider {
        provider: name.to_string(),
        valid: LlmProvider::valid_names(),
    })
}

/// True when `DEBUG=1` is set in the environment.
pub fn debug_from_env() -> bool {
    std::env::var("DEBUG").is_ok_and(|value| value.trim() == "1")
}

/// Parses and validates command-line arguments against the given `now`.
///
/// Clap errors (including `--help` and `--version`) are returned as
/// `clap::Error` inside the `anyhow::Error`; validation failures as
/// [`ReflectError`].
pub fn parse_args_at<I, T>(args: I, now: DateTime<Utc>) -> anyhow::Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    Ok(cli.into_config(now)?)
}

/// Parses and validates command-line arguments relative to the current time.
pub fn parse_args<I, T>(args: I) -> anyhow::Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    parse_args_at(args, Utc::now())
}
