//! Interview document loading

use crate::error::Result;
use crate::interview::parse_document_filename;
use crate::interview::Interview;
use crate::interview::InterviewMetadata;
use crate::segmenter::segment_turns;
use ignore::WalkBuilder;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

/// File extensions accepted as interview documents
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Result of scanning an input directory.
///
/// Unreadable documents are isolated failures: they are recorded in
/// `skipped` and the rest of the corpus loads normally.
#[derive(Debug)]
pub struct LoadedCorpus {
    /// Successfully loaded interviews, ordered by source path
    pub interviews: Vec<Interview>,
    /// Documents that could not be read, with the error message
    pub skipped: Vec<(PathBuf, String)>,
}

/// Loads interview documents from a directory tree
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    root: PathBuf,
}

impl DocumentLoader {
    /// Create a loader rooted at the given input directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scan the input directory and load every interview document.
    ///
    /// Hidden files and anything matched by gitignore rules are skipped,
    /// as are files without a recognized extension.
    pub fn load_all(&self) -> Result<LoadedCorpus> {
        let mut paths = Vec::new();
        for entry in WalkBuilder::new(&self.root).hidden(true).build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.into_path();
            let ext = path
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut interviews = Vec::new();
        let mut skipped = Vec::new();
        for path in paths {
            match self.load_document(&path) {
                Ok(interview) => {
                    debug!(
                        id = %interview.id,
                        turns = interview.turns.len(),
                        "Loaded interview document"
                    );
                    interviews.push(interview);
                }
                Err(e) => {
                    warn!("Skipping unreadable document {}: {}", path.display(), e);
                    skipped.push((path, e.to_string()));
                }
            }
        }

        Ok(LoadedCorpus {
            interviews,
            skipped,
        })
    }

    /// Load a single interview document
    pub fn load_document(&self, path: &Path) -> Result<Interview> {
        let raw_text = std::fs::read_to_string(path)?;
        let (recorded_at, id) = parse_document_filename(path);
        let turns = segment_turns(&raw_text);

        Ok(Interview {
            id,
            raw_text,
            metadata: InterviewMetadata {
                recorded_at,
                location: None,
                participant_count: None,
                source_path: path.to_path_buf(),
            },
            turns,
        })
    }
}
