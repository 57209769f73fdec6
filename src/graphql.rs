use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    dates::DateRange,
    filter::SearchQueryBuilder,
    types::{Comment, Contribution, ContributionKind, Review},
};

/// Nodes requested per search page; GitHub's maximum.
pub const PAGE_SIZE: usize = 100;

/// Body prefix of the comment a merge bot leaves on every pull request it
/// lands.
pub const MERGE_ACTIVITY_MARKER: &str = "### Merge activity";

const MERGED_PULL_REQUESTS_QUERY: &str = r#"
    query($query: String!, $after: String) {
        search(query: $query, type: ISSUE, first: 100, after: $after) {
            nodes {
                ... on PullRequest {
                    title
                    body
                    closedAt
                    url
                    repository {
                        nameWithOwner
                    }
                }
            }
            pageInfo {
                hasNextPage
                endCursor
            }
        }
    }
"#;

const CLOSED_ISSUES_QUERY: &str = r#"
    query($query: String!, $after: String) {
        search(query: $query, type: ISSUE, first: 100, after: $after) {
            nodes {
                ... on Issue {
                    title
                    body
                    closedAt
                    url
                    repository {
                        nameWithOwner
                    }
                }
            }
            pageInfo {
                hasNextPage
                endCursor
            }
        }
    }
"#;

const REVIEWED_PULL_REQUESTS_QUERY: &str = r#"
    query($query: String!, $after: String) {
        search(query: $query, type: ISSUE, first: 100, after: $after) {
            nodes {
                ... on PullRequest {
                    permalink
                    title
                    body
                    closedAt
                    url
                    repository {
                        nameWithOwner
                    }
                    comments(first: 100) {
                        nodes {
                            author {
                                login
                            }
                            body
                        }
                    }
                    reviews(first: 20) {
                        nodes {
                            author {
                                login
                            }
                            body
                            state
                            comments(first: 100) {
                                nodes {
                                    author {
                                        login
                                    }
                                    body
                                }
                            }
                        }
                    }
                }
            }
            pageInfo {
                hasNextPage
                endCursor
            }
        }
    }
"#;

/// The three independent searches run for every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    MergedPullRequests,
    ClosedIssues,
    ReviewedPullRequests,
}

impl QueryKind {
    pub fn document(&self) -> &'static str {
        match self {
            QueryKind::MergedPullRequests => MERGED_PULL_REQUESTS_QUERY,
            QueryKind::ClosedIssues => CLOSED_ISSUES_QUERY,
            QueryKind::ReviewedPullRequests => REVIEWED_PULL_REQUESTS_QUERY,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            QueryKind::MergedPullRequests => "merged pull requests",
            QueryKind::ClosedIssues => "closed issues",
            QueryKind::ReviewedPullRequests => "reviewed pull requests",
        }
    }

    /// Builds the search string for this kind. `org_filter` and
    /// `repo_filter` are fragments from [`crate::filter::build_filter`].
    pub fn search_query(
        &self,
        username: &str,
        date_range: &DateRange,
        org_filter: &str,
        repo_filter: &str,
    ) -> String {
        let range = date_range.github_range();
        let mut builder = SearchQueryBuilder::new();

        match self {
            QueryKind::MergedPullRequests => {
                builder
                    .author(username)
                    .is("pr")
                    .is("merged")
                    .date("merged", &range);
            }
            QueryKind::ClosedIssues => {
                builder
                    .author(username)
                    .is("issue")
                    .is("closed")
                    .date("closed", &range);
            }
            QueryKind::ReviewedPullRequests => {
                builder
                    .reviewed_by(username)
                    .is("pr")
                    .is("merged")
                    .date("merged", &range);
            }
        }

        builder.fragment(org_filter).fragment(repo_filter);

        if *self == QueryKind::ReviewedPullRequests {
            builder.not_author(username);
        }

        builder.build()
    }
}

/// Builds the request body for one search page.
pub fn create_graphql_query(kind: QueryKind, search_query: &str, after: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "query": kind.document(),
        "variables": {
            "query": search_query,
            "after": after,
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub extensions: Option<serde_json::Value>,
}

impl GraphQLError {
    pub fn is_rate_limit(&self) -> bool {
        self.kind.as_deref() == Some("RATE_LIMITED")
            || self.message.to_lowercase().contains("rate limit exceeded")
    }

    /// Epoch seconds at which the rate limit window resets, when GitHub
    /// reported it.
    pub fn rate_limit_reset(&self) -> Option<i64> {
        self.extensions
            .as_ref()?
            .pointer("/rateLimit/reset")?
            .as_i64()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchData<N> {
    pub search: SearchResults<N>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults<N> {
    pub nodes: Vec<N>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRepository {
    pub name_with_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLActor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLConnection<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLComment {
    pub author: Option<GraphQLActor>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLReview {
    pub author: Option<GraphQLActor>,
    pub body: String,
    pub state: String,
    pub comments: GraphQLConnection<GraphQLComment>,
}

/// Node shape shared by the merged pull request and closed issue searches.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLContribution {
    pub title: String,
    pub body: Option<String>,
    pub closed_at: DateTime<Utc>,
    pub url: String,
    pub repository: GraphQLRepository,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLReviewedPullRequest {
    pub permalink: String,
    pub title: String,
    pub body: Option<String>,
    pub closed_at: DateTime<Utc>,
    pub url: String,
    pub repository: GraphQLRepository,
    pub comments: GraphQLConnection<GraphQLComment>,
    pub reviews: GraphQLConnection<GraphQLReview>,
}

/// Decides which comments on a reviewed pull request belong in the report.
///
/// Only comments written by `author` are kept, and of those any whose body
/// starts with one of the skip prefixes is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFilter {
    author: String,
    skip_prefixes: Vec<String>,
}

impl CommentFilter {
    /// A filter for `author` that skips merge-bot activity comments.
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            skip_prefixes: vec![MERGE_ACTIVITY_MARKER.to_string()],
        }
    }

    pub fn with_skip_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_prefixes.extend(
            prefixes
                .into_iter()
                .map(Into::into)
                .filter(|prefix: &String| !prefix.is_empty()),
        );
        self
    }

    pub fn is_author(&self, actor: Option<&GraphQLActor>) -> bool {
        actor.is_some_and(|actor| actor.login == self.author)
    }

    pub fn keeps_comment(&self, comment: &GraphQLComment) -> bool {
        self.is_author(comment.author.as_ref())
            && !self
                .skip_prefixes
                .iter()
                .any(|prefix| comment.body.starts_with(prefix.as_str()))
    }

    fn convert_comments(&self, comments: GraphQLConnection<GraphQLComment>) -> Vec<Comment> {
        comments
            .nodes
            .into_iter()
            .filter(|comment| self.keeps_comment(comment))
            .map(|comment| Comment {
                author: self.author.clone(),
                body: comment.body,
            })
            .collect()
    }

    fn convert_reviews(&self, reviews: GraphQLConnection<GraphQLReview>) -> Vec<Review> {
        reviews
            .nodes
            .into_iter()
            .filter(|review| self.is_author(review.author.as_ref()))
            .map(|review| Review {
                author: self.author.clone(),
                state: review.state,
                body: review.body,
                comments: self.convert_comments(review.comments),
            })
            .collect()
    }
}

/// Converts a merged pull request or closed issue node into a contribution.
pub fn convert_contribution(node: GraphQLContribution, kind: ContributionKind) -> Contribution {
    Contribution {
        title: node.title,
        body: node.body.unwrap_or_default(),
        url: node.url,
        permalink: None,
        closed_at: node.closed_at,
        repository: node.repository.name_with_owner,
        kind,
        comments: Vec::new(),
        reviews: Vec::new(),
    }
}

/// Converts a reviewed pull request node, keeping only the reviewer's own
/// comments and reviews.
pub fn convert_reviewed_pull_request(
    node: GraphQLReviewedPullRequest,
    filter: &CommentFilter,
) -> Contribution {
    Contribution {
        title: node.title,
        body: node.body.unwrap_or_default(),
        url: node.url,
        permalink: Some(node.permalink),
        closed_at: node.closed_at,
        repository: node.repository.name_with_owner,
        kind: ContributionKind::PullRequest,
        comments: filter.convert_comments(node.comments),
        reviews: filter.convert_reviews(node.reviews),
    }
}
