use std::{io::Write, path::PathBuf};

use anyhow::Result;

use crate::{
    dates::{DateRange, format_date_for_display},
    types::Contributions,
};

/// Writes the end-of-run summary: what was fetched, for which period, and
/// which files were produced.
pub fn write_run_summary(
    username: &str,
    contributions: &Contributions,
    date_range: &DateRange,
    written: &[PathBuf],
    out: &mut impl Write,
) -> Result<()> {
    writeln!(
        out,
        "Fetched {} {}, {} {} and {} reviewed {} for {}",
        contributions.prs.len(),
        plural(contributions.prs.len(), "PR", "PRs"),
        contributions.issues.len(),
        plural(contributions.issues.len(), "issue", "issues"),
        contributions.reviews.len(),
        plural(contributions.reviews.len(), "PR", "PRs"),
        username
    )?;
    writeln!(
        out,
        "From {} to {}",
        format_date_for_display(date_range.start()),
        format_date_for_display(date_range.end())
    )?;

    if !written.is_empty() {
        writeln!(out)?;
        writeln!(out, "Output files:")?;
        for path in written {
            writeln!(out, "  {}", path.display())?;
        }
    }

    Ok(())
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}
