use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;

use crate::types::{Contribution, ContributionKind};

/// Repositories in order of first appearance.
fn unique_repositories(items: &[Contribution]) -> Vec<&str> {
    let mut repos: Vec<&str> = Vec::new();
    for item in items {
        if !repos.contains(&item.repository.as_str()) {
            repos.push(&item.repository);
        }
    }
    repos
}

/// Newest first; ties keep their fetch order.
fn sorted_by_closed_at(items: &[Contribution]) -> Vec<&Contribution> {
    let mut sorted: Vec<&Contribution> = items.iter().collect();
    sorted.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
    sorted
}

fn write_repositories(repos: &[&str], out: &mut impl Write) -> Result<()> {
    writeln!(out, "## Repositories")?;
    for repo in repos {
        writeln!(out, "- {repo}")?;
    }
    writeln!(out)?;
    Ok(())
}

/// Renders merged pull requests and closed issues as one Markdown report.
pub fn write_contributions_document(
    prs: &[Contribution],
    issues: &[Contribution],
    out: &mut impl Write,
) -> Result<()> {
    let items: Vec<Contribution> = prs.iter().chain(issues).cloned().collect();
    let repos = unique_repositories(&items);
    let pr_count = items
        .iter()
        .filter(|item| item.kind == ContributionKind::PullRequest)
        .count();
    let issue_count = items.len() - pr_count;

    writeln!(out, "# GitHub Activity Report\n")?;
    writeln!(out, "## Statistics")?;
    writeln!(out, "- Total Repositories: {}", repos.len())?;
    writeln!(out, "- Total Pull Requests: {pr_count}")?;
    writeln!(out, "- Total Issues: {issue_count}\n")?;
    write_repositories(&repos, out)?;

    for item in sorted_by_closed_at(&items) {
        writeln!(out, "## {}", item.title)?;
        writeln!(out, "URL: {}", item.url)?;
        writeln!(out, "Type: {}", item.kind.label())?;
        writeln!(out, "Repository: {}", item.repository)?;
        writeln!(
            out,
            "Closed at: {}\n",
            item.closed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        writeln!(out, "{}\n", item.body)?;
        writeln!(out, "---\n")?;
    }

    Ok(())
}

/// Renders the user's review activity on other people's pull requests.
pub fn write_review_comments_document(
    reviews: &[Contribution],
    out: &mut impl Write,
) -> Result<()> {
    let repos = unique_repositories(reviews);
    let issue_comments: usize = reviews.iter().map(|pr| pr.comments.len()).sum();
    let review_comments: usize = reviews
        .iter()
        .flat_map(|pr| &pr.reviews)
        .map(|review| review.comments.len())
        .sum();

    writeln!(out, "# GitHub PR comments Report\n")?;
    writeln!(out, "## Statistics")?;
    writeln!(out, "- Total Repositories: {}", repos.len())?;
    writeln!(out, "- Total PR reviews: {}", reviews.len())?;
    writeln!(
        out,
        "- Total PR comments: {}",
        issue_comments + review_comments
    )?;
    write_repositories(&repos, out)?;

    for item in sorted_by_closed_at(reviews) {
        writeln!(out, "## {}", item.title)?;
        writeln!(
            out,
            "Link: {}",
            item.permalink.as_deref().unwrap_or(&item.url)
        )?;
        writeln!(out, "Type: {}", item.kind.label())?;
        writeln!(out, "Repository: {}", item.repository)?;
        writeln!(out, "Comments:")?;
        for comment in &item.comments {
            writeln!(out, " - {}", comment.body)?;
        }
        writeln!(out, "Reviews:")?;
        for review in &item.reviews {
            writeln!(out, " - {}: {}", review.state, review.body)?;
            for comment in &review.comments {
                writeln!(out, "   - {}", comment.body)?;
            }
        }
        writeln!(out, "---\n")?;
    }

    Ok(())
}

/// [`write_contributions_document`] into a string.
pub fn generate_contributions_document(
    prs: &[Contribution],
    issues: &[Contribution],
) -> Result<String> {
    let mut buf = Vec::new();
    write_contributions_document(prs, issues, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// [`write_review_comments_document`] into a string.
pub fn generate_review_comments_document(reviews: &[Contribution]) -> Result<String> {
    let mut buf = Vec::new();
    write_review_comments_document(reviews, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
