use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{
    dates::DateRange,
    error::{ReflectError, Result},
    filter::{FilterAxis, FilterSpec},
    github::{Forge, format_reset_time},
    graphql::{
        CommentFilter, GraphQLContribution, GraphQLError, GraphQLReviewedPullRequest, QueryKind,
        SearchData, SearchResults, convert_contribution, convert_reviewed_pull_request,
        create_graphql_query,
    },
    types::{Contribution, ContributionKind, Contributions},
};

/// Everything the aggregator needs to run the three searches.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub username: String,
    pub date_range: DateRange,
    pub org_filter: FilterSpec,
    pub repo_filter: FilterSpec,
    pub comment_filter: CommentFilter,
    pub debug: bool,
}

impl FetchRequest {
    /// The search string sent for `kind`.
    pub fn search_query(&self, kind: QueryKind) -> String {
        kind.search_query(
            &self.username,
            &self.date_range,
            &self.org_filter.render(FilterAxis::Organization),
            &self.repo_filter.render(FilterAxis::Repository),
        )
    }
}

/// Fetches merged pull requests, closed issues and reviewed pull requests
/// concurrently.
///
/// The first failure aborts the whole fetch; results from searches that
/// already finished are dropped.
pub async fn fetch_contributions<F>(request: &FetchRequest, forge: &F) -> Result<Contributions>
where
    F: Forge + Sync,
{
    let (prs, issues, reviews) = tokio::try_join!(
        fetch_merged_pull_requests(request, forge),
        fetch_closed_issues(request, forge),
        fetch_reviewed_pull_requests(request, forge),
    )?;

    Ok(Contributions {
        prs,
        issues,
        reviews,
    })
}

pub async fn fetch_merged_pull_requests<F>(
    request: &FetchRequest,
    forge: &F,
) -> Result<Vec<Contribution>>
where
    F: Forge + Sync,
{
    let kind = QueryKind::MergedPullRequests;
    let nodes: Vec<GraphQLContribution> =
        fetch_all_search_results(forge, kind, &request.search_query(kind), request.debug).await?;
    log_fetched(kind, nodes.len());

    Ok(nodes
        .into_iter()
        .map(|node| convert_contribution(node, ContributionKind::PullRequest))
        .collect())
}

pub async fn fetch_closed_issues<F>(request: &FetchRequest, forge: &F) -> Result<Vec<Contribution>>
where
    F: Forge + Sync,
{
    let kind = QueryKind::ClosedIssues;
    let nodes: Vec<GraphQLContribution> =
        fetch_all_search_results(forge, kind, &request.search_query(kind), request.debug).await?;
    log_fetched(kind, nodes.len());

    Ok(nodes
        .into_iter()
        .map(|node| convert_contribution(node, ContributionKind::Issue))
        .collect())
}

pub async fn fetch_reviewed_pull_requests<F>(
    request: &FetchRequest,
    forge: &F,
) -> Result<Vec<Contribution>>
where
    F: Forge + Sync,
{
    let kind = QueryKind::ReviewedPullRequests;
    let nodes: Vec<GraphQLReviewedPullRequest> =
        fetch_all_search_results(forge, kind, &request.search_query(kind), request.debug).await?;
    log_fetched(kind, nodes.len());

    Ok(nodes
        .into_iter()
        .map(|node| convert_reviewed_pull_request(node, &request.comment_filter))
        .collect())
}

fn log_fetched(kind: QueryKind, count: usize) {
    info!("Fetched {} {}", count, kind.description());
}

/// Walks every page of one search, appending nodes in arrival order until
/// GitHub reports no further page. A further page without a cursor is an
/// error rather than a truncated result.
pub async fn fetch_all_search_results<N, F>(
    forge: &F,
    kind: QueryKind,
    search_query: &str,
    debug: bool,
) -> Result<Vec<N>>
where
    N: DeserializeOwned,
    F: Forge + Sync,
{
    let mut all_nodes = Vec::new();
    let mut after_cursor: Option<String> = None;
    let mut page_count = 0;

    if debug {
        debug!(search = search_query, "searching {}", kind.description());
    }

    loop {
        page_count += 1;
        let query = create_graphql_query(kind, search_query, after_cursor.as_deref());
        let response = forge.graphql(&query).await?;
        let page: SearchResults<N> = parse_search_response(response)?;

        all_nodes.extend(page.nodes);

        if debug {
            debug!(
                page = page_count,
                total = all_nodes.len(),
                cursor = page.page_info.end_cursor.as_deref().unwrap_or("-"),
                "fetched page of {}",
                kind.description()
            );
        }

        if !page.page_info.has_next_page {
            break;
        }

        after_cursor = match page.page_info.end_cursor {
            Some(cursor) => Some(cursor),
            None => {
                return Err(ReflectError::Upstream(
                    "GitHub reported another page without a cursor".to_string(),
                ));
            }
        };

        info!("Fetched {} {} so far...", all_nodes.len(), kind.description());
    }

    Ok(all_nodes)
}

/// Splits a GraphQL response into its search page, turning any reported
/// error into a [`ReflectError`].
pub fn parse_search_response<N>(mut response: serde_json::Value) -> Result<SearchResults<N>>
where
    N: DeserializeOwned,
{
    if let Some(errors) = response
        .get_mut("errors")
        .map(serde_json::Value::take)
        .filter(|errors| !errors.is_null())
    {
        let errors: Vec<GraphQLError> = serde_json::from_value(errors).map_err(|e| {
            ReflectError::Upstream(format!("Unexpected GitHub error response: {e}"))
        })?;
        if let Some(error) = errors.into_iter().next() {
            return Err(classify_graphql_error(error));
        }
    }

    let data = response
        .get_mut("data")
        .map(serde_json::Value::take)
        .ok_or_else(|| ReflectError::Upstream("GitHub response contained no data".to_string()))?;

    let data: SearchData<N> = serde_json::from_value(data).map_err(|e| {
        ReflectError::Upstream(format!("Unexpected GitHub search response: {e}"))
    })?;

    Ok(data.search)
}

fn classify_graphql_error(error: GraphQLError) -> ReflectError {
    if error.is_rate_limit() {
        let resets_at = error
            .rate_limit_reset()
            .map(format_reset_time)
            .unwrap_or_else(|| "an unknown time".to_string());
        ReflectError::RateLimitExceeded { resets_at }
    } else {
        ReflectError::Upstream(error.message)
    }
}
