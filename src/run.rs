use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::{
    cli::Config,
    github::Forge,
    llm::{self, LlmClient},
    output::{
        BRAG_DOCUMENT_FILE, CONTRIBUTIONS_FILE, ConfirmOverwrite, OutputDir,
        REVIEW_CONTRIBUTIONS_FILE, SUMMARY_FILE,
    },
    query::fetch_contributions,
    report::{generate_contributions_document, generate_review_comments_document},
    types::Contributions,
};

pub type BoxedLlmClient = Box<dyn LlmClient + Send + Sync>;

/// Resolves the LLM client when a brag document was requested, so a
/// missing API key fails before any GitHub request is made.
pub fn prepare_llm(config: &Config) -> Result<Option<BoxedLlmClient>> {
    if !config.generate_brag {
        return Ok(None);
    }

    let api_key = llm::get_api_key(config.llm.provider)?;
    Ok(Some(llm::create_client(&config.llm, api_key, config.debug)?))
}

/// Where the reports went and what they were built from.
#[derive(Debug)]
pub struct RunOutcome {
    pub contributions: Contributions,
    pub written: Vec<PathBuf>,
}

/// Fetches everything for `config`, writes the reports and, when an LLM
/// client is supplied, the summary and brag document.
///
/// Files are only written once all three searches have succeeded.
pub async fn run<F>(
    config: &Config,
    forge: &F,
    llm_client: Option<&(dyn LlmClient + Send + Sync)>,
    output: &OutputDir,
    confirm: &dyn ConfirmOverwrite,
) -> Result<RunOutcome>
where
    F: Forge + Sync,
{
    info!(
        "Fetching GitHub activity for {} ({})",
        config.username,
        config.date_range.github_range()
    );
    let contributions = fetch_contributions(&config.fetch_request(), forge).await?;

    let mut written = Vec::new();

    let reviews = output.write_file_safely(
        REVIEW_CONTRIBUTIONS_FILE,
        &generate_review_comments_document(&contributions.reviews)?,
        config.force,
        confirm,
    )?;
    written.push(reviews.path);

    let report = output.write_file_safely(
        CONTRIBUTIONS_FILE,
        &generate_contributions_document(&contributions.prs, &contributions.issues)?,
        config.force,
        confirm,
    )?;
    written.push(report.path);

    if let Some(client) = llm_client {
        info!("Generating contributions summary");
        let summary = llm::generate_contributions_summary(client, &report.content).await?;
        let summary = output.write_file_safely(SUMMARY_FILE, &summary, config.force, confirm)?;
        written.push(summary.path);

        info!("Generating brag document");
        let brag =
            llm::generate_brag_document(client, &summary.content, &config.date_range).await?;
        let brag = output.write_file_safely(BRAG_DOCUMENT_FILE, &brag, config.force, confirm)?;
        written.push(brag.path);
    }

    Ok(RunOutcome {
        contributions,
        written,
    })
}
