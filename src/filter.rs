use std::sync::LazyLock;

use regex::Regex;

/// GitHub caps account and organization names at 39 characters.
pub const MAX_ACCOUNT_NAME_LEN: usize = 39;

static ACCOUNT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid account name pattern"));

static REPO_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("valid repository name pattern"));

/// The two dimensions a search can be narrowed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAxis {
    Organization,
    Repository,
}

impl FilterAxis {
    pub fn prefix(&self) -> &'static str {
        match self {
            FilterAxis::Organization => "org",
            FilterAxis::Repository => "repo",
        }
    }

    pub fn include_flag(&self) -> &'static str {
        match self {
            FilterAxis::Organization => "--include-orgs",
            FilterAxis::Repository => "--include-repos",
        }
    }

    pub fn exclude_flag(&self) -> &'static str {
        match self {
            FilterAxis::Organization => "--exclude-orgs",
            FilterAxis::Repository => "--exclude-repos",
        }
    }

    /// Checks a single entry against the naming rules of this axis.
    pub fn is_valid_name(&self, name: &str) -> bool {
        match self {
            FilterAxis::Organization => is_valid_account_name(name),
            FilterAxis::Repository => is_valid_repo(name),
        }
    }
}

/// Include/exclude lists for one axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl FilterSpec {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Renders the search fragment for these lists, see [`build_filter`].
    pub fn render(&self, axis: FilterAxis) -> String {
        build_filter(axis.prefix(), &self.include, &self.exclude)
    }
}

/// Builds a search-query fragment restricting results by `prefix`.
///
/// Blank entries are ignored. A non-empty include list wins over the
/// exclude list; several includes are OR-grouped in parentheses while
/// excludes are simply negated one after another. The fragment carries its
/// own leading space, or is empty when nothing remains.
pub fn build_filter<S: AsRef<str>>(prefix: &str, include: &[S], exclude: &[S]) -> String {
    let include = non_blank(include);
    if !include.is_empty() {
        if let [single] = include.as_slice() {
            return format!(" {prefix}:{single}");
        }
        let terms: Vec<String> = include
            .iter()
            .map(|name| format!("{prefix}:{name}"))
            .collect();
        return format!(" ({})", terms.join(" OR "));
    }

    let exclude = non_blank(exclude);
    if !exclude.is_empty() {
        let terms: Vec<String> = exclude
            .iter()
            .map(|name| format!("-{prefix}:{name}"))
            .collect();
        return format!(" {}", terms.join(" "));
    }

    String::new()
}

fn non_blank<S: AsRef<str>>(names: &[S]) -> Vec<&str> {
    names
        .iter()
        .map(|name| name.as_ref().trim())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Valid GitHub user or organization login.
pub fn is_valid_account_name(name: &str) -> bool {
    name.len() <= MAX_ACCOUNT_NAME_LEN && ACCOUNT_NAME.is_match(name)
}

/// Valid `owner/name` repository reference.
pub fn is_valid_repo(repo: &str) -> bool {
    match repo.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] => is_valid_account_name(owner) && REPO_NAME.is_match(name),
        _ => false,
    }
}

/// Assembles a GitHub search string from ordered terms, followed by any
/// pre-rendered filter fragments.
#[derive(Debug, Default)]
pub struct SearchQueryBuilder {
    terms: Vec<String>,
    fragments: String,
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(&mut self, login: &str) -> &mut Self {
        self.terms.push(format!("author:{login}"));
        self
    }

    pub fn reviewed_by(&mut self, login: &str) -> &mut Self {
        self.terms.push(format!("reviewed-by:{login}"));
        self
    }

    pub fn is(&mut self, qualifier: &str) -> &mut Self {
        self.terms.push(format!("is:{qualifier}"));
        self
    }

    pub fn date(&mut self, field: &str, range: &str) -> &mut Self {
        self.terms.push(format!("{field}:{range}"));
        self
    }

    pub fn fragment(&mut self, fragment: &str) -> &mut Self {
        self.fragments.push_str(fragment);
        self
    }

    /// Terms placed after the filter fragments.
    pub fn not_author(&mut self, login: &str) -> &mut Self {
        self.fragments.push_str(&format!(" -author:{login}"));
        self
    }

    pub fn build(&self) -> String {
        format!("{}{}", self.terms.join(" "), self.fragments)
    }
}
