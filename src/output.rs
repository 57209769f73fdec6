use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::error::ReflectError;

pub const OUTPUT_DIR: &str = "output";

pub const REVIEW_CONTRIBUTIONS_FILE: &str = "review_contributions.md";
pub const CONTRIBUTIONS_FILE: &str = "contributions.md";
pub const SUMMARY_FILE: &str = "summarized_contributions.md";
pub const BRAG_DOCUMENT_FILE: &str = "brag_document.md";

pub const ALLOWED_FILES: [&str; 4] = [
    CONTRIBUTIONS_FILE,
    REVIEW_CONTRIBUTIONS_FILE,
    SUMMARY_FILE,
    BRAG_DOCUMENT_FILE,
];

/// Strips any directory components from `filename` and checks the result
/// against [`ALLOWED_FILES`].
pub fn sanitize_filename(filename: &str) -> Result<&'static str, ReflectError> {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| ALLOWED_FILES.into_iter().find(|allowed| *allowed == name))
        .ok_or_else(|| ReflectError::InvalidOutputFile(filename.to_string()))
}

/// Asks whether an existing output file may be replaced.
pub trait ConfirmOverwrite {
    fn confirm_overwrite(&self, path: &Path) -> io::Result<bool>;
}

/// Prompts on stdout and reads the answer from stdin. Only `y`/`Y` accepts.
pub struct StdinConfirm;

impl ConfirmOverwrite for StdinConfirm {
    fn confirm_overwrite(&self, path: &Path) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(
            stdout,
            "! File {} already exists. Overwrite? (y/N) ",
            path.display()
        )?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

/// What ended up in an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// The file's contents after the call; the previous contents when the
    /// overwrite was declined.
    pub content: String,
    pub did_write: bool,
}

/// The directory reports are written to.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl Default for OutputDir {
    fn default() -> Self {
        Self::new(OUTPUT_DIR)
    }
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `content` to an allow-listed file, creating the directory as
    /// needed. Unless `force` is set, an existing file is only replaced
    /// after confirmation; when declined its current contents are returned
    /// so later steps build on what is on disk.
    pub fn write_file_safely(
        &self,
        filename: &str,
        content: &str,
        force: bool,
        confirm: &dyn ConfirmOverwrite,
    ) -> Result<WriteOutcome> {
        let name = sanitize_filename(filename)?;
        let path = self.root.join(name);

        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;

        if !force && path.exists() {
            let overwrite = confirm
                .confirm_overwrite(&path)
                .context("Failed to read overwrite confirmation")?;
            if !overwrite {
                info!("Using existing contents of {}", path.display());
                let existing = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                return Ok(WriteOutcome {
                    path,
                    content: existing,
                    did_write: false,
                });
            }
        }

        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), bytes = content.len(), "wrote output file");

        Ok(WriteOutcome {
            path,
            content: content.to_string(),
            did_write: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Answer {
        accept: bool,
        asked: Cell<usize>,
    }

    impl Answer {
        fn new(accept: bool) -> Self {
            Self {
                accept,
                asked: Cell::new(0),
            }
        }
    }

    impl ConfirmOverwrite for Answer {
        fn confirm_overwrite(&self, _path: &Path) -> io::Result<bool> {
            self.asked.set(self.asked.get() + 1);
            Ok(self.accept)
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("contributions.md").unwrap(),
            "contributions.md"
        );
        assert_eq!(
            sanitize_filename("../../etc/brag_document.md").unwrap(),
            "brag_document.md"
        );
        assert_eq!(
            sanitize_filename("notes.md").unwrap_err(),
            ReflectError::InvalidOutputFile("notes.md".to_string())
        );
        assert!(sanitize_filename("").is_err());
    }

    #[test]
    fn test_writes_new_file_without_asking() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().join("output"));
        let confirm = Answer::new(false);

        let outcome = output
            .write_file_safely(CONTRIBUTIONS_FILE, "# report", false, &confirm)
            .unwrap();

        assert!(outcome.did_write);
        assert_eq!(confirm.asked.get(), 0);
        assert_eq!(fs::read_to_string(outcome.path).unwrap(), "# report");
    }

    #[test]
    fn test_declined_overwrite_keeps_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path());
        fs::write(dir.path().join(SUMMARY_FILE), "old summary").unwrap();
        let confirm = Answer::new(false);

        let outcome = output
            .write_file_safely(SUMMARY_FILE, "new summary", false, &confirm)
            .unwrap();

        assert!(!outcome.did_write);
        assert_eq!(outcome.content, "old summary");
        assert_eq!(confirm.asked.get(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap(),
            "old summary"
        );
    }

    #[test]
    fn test_force_overwrites_without_asking() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path());
        fs::write(dir.path().join(BRAG_DOCUMENT_FILE), "old").unwrap();
        let confirm = Answer::new(false);

        let outcome = output
            .write_file_safely(BRAG_DOCUMENT_FILE, "new", true, &confirm)
            .unwrap();

        assert!(outcome.did_write);
        assert_eq!(confirm.asked.get(), 0);
        assert_eq!(outcome.content, "new");
    }

    #[test]
    fn test_rejects_unknown_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path());

        let err = output
            .write_file_safely("secrets.txt", "x", true, &Answer::new(true))
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<ReflectError>(),
            Some(&ReflectError::InvalidOutputFile("secrets.txt".to_string()))
        );
    }
}
