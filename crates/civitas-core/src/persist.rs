//! Persistence of annotation artifacts

use crate::annotation::InterviewAnnotation;
use crate::error::Error;
use crate::error::Result;
use crate::report::CorpusReport;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

/// Filename of the corpus validation summary
pub const REPORT_FILENAME: &str = "validation_summary.json";

/// Suffix of per-interview annotation artifacts
const ANNOTATION_SUFFIX: &str = "_final_annotation.json";

/// Pipeline stages gated by completion markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Annotation stage (LLM calls, per-interview artifacts)
    Annotate,
    /// Validation stage (corpus report)
    Validate,
}

impl Stage {
    fn marker_name(self) -> &'static str {
        match self {
            Self::Annotate => ".annotate.done",
            Self::Validate => ".validate.done",
        }
    }
}

/// Writes and re-reads annotation artifacts under an output directory.
///
/// Artifacts are append-only: each interview's final annotation is written
/// once and never rewritten within a run.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    root: PathBuf,
}

impl AnnotationStore {
    /// Create a store rooted at the output directory, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The output directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the final annotation artifact for an interview
    pub fn annotation_path(&self, interview_id: &str) -> PathBuf {
        self.root
            .join(format!("{interview_id}{ANNOTATION_SUFFIX}"))
    }

    /// Write an interview's final annotation as pretty-printed JSON
    pub fn write_annotation(&self, annotation: &InterviewAnnotation) -> Result<PathBuf> {
        let path = self.annotation_path(&annotation.interview_id);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, annotation)?;
        std::io::Write::flush(&mut writer)?;
        debug!(path = %path.display(), "Wrote final annotation");
        Ok(path)
    }

    /// Load one final annotation back from disk
    pub fn load_annotation(&self, path: &Path) -> Result<InterviewAnnotation> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| Error::storage(format!("{}: {e}", path.display())))
    }

    /// Load every final annotation under the output directory, ordered by
    /// interview id. Used by the validate stage to rebuild the corpus
    /// report without LLM calls.
    pub fn load_all_annotations(&self) -> Result<Vec<InterviewAnnotation>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(ANNOTATION_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|path| self.load_annotation(path))
            .collect()
    }

    /// Write the corpus validation summary
    pub fn write_report(&self, report: &CorpusReport) -> Result<PathBuf> {
        let path = self.root.join(REPORT_FILENAME);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        std::io::Write::flush(&mut writer)?;
        Ok(path)
    }

    /// Load the corpus validation summary, if present
    pub fn load_report(&self) -> Result<Option<CorpusReport>> {
        let path = self.root.join(REPORT_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        Ok(Some(serde_json::from_reader(BufReader::new(file))?))
    }

    /// Mark a stage as complete
    pub fn write_marker(&self, stage: Stage) -> Result<()> {
        std::fs::write(self.root.join(stage.marker_name()), b"")?;
        Ok(())
    }

    /// Whether a stage has completed
    pub fn stage_complete(&self, stage: Stage) -> bool {
        self.root.join(stage.marker_name()).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::InterviewSynthesis;
    use crate::annotation::ProcessingStats;
    use crate::validate::InterviewState;
    use crate::validate::QualityReport;
    use chrono::Utc;

    fn sample_annotation(id: &str) -> InterviewAnnotation {
        InterviewAnnotation {
            interview_id: id.to_string(),
            recorded_at: None,
            annotated_at: Utc::now(),
            turns: vec![],
            synthesis: InterviewSynthesis::default(),
            failed_batches: vec![],
            stats: ProcessingStats {
                total_turns: 8,
                analyzed_turns: 8,
                coverage_percentage: 100.0,
                ..Default::default()
            },
            quality: QualityReport {
                quality_score: 1.0,
                issues: vec![],
            },
            state: InterviewState::Accepted,
        }
    }

    #[test]
    fn test_annotation_roundtrip_uses_conventional_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path()).unwrap();

        let path = store.write_annotation(&sample_annotation("ab12")).unwrap();
        assert!(path.ends_with("ab12_final_annotation.json"));

        let loaded = store.load_annotation(&path).unwrap();
        assert_eq!(loaded.interview_id, "ab12");
        assert_eq!(loaded.state, InterviewState::Accepted);
    }

    #[test]
    fn test_load_all_annotations_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path()).unwrap();
        store.write_annotation(&sample_annotation("b")).unwrap();
        store.write_annotation(&sample_annotation("a")).unwrap();
        std::fs::write(dir.path().join("notes.json"), b"{}").unwrap();

        let all = store.load_all_annotations().unwrap();
        let ids: Vec<&str> = all.iter().map(|a| a.interview_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_stage_markers() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path()).unwrap();

        assert!(!store.stage_complete(Stage::Annotate));
        store.write_marker(Stage::Annotate).unwrap();
        assert!(store.stage_complete(Stage::Annotate));
        assert!(!store.stage_complete(Stage::Validate));
    }

    #[test]
    fn test_report_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path()).unwrap();
        assert!(store.load_report().unwrap().is_none());

        let report = CorpusReport::new(uuid::Uuid::new_v4(), vec![], vec![], 0);
        store.write_report(&report).unwrap();
        let loaded = store.load_report().unwrap().unwrap();
        assert_eq!(loaded.run_id, report.run_id);
    }
}
