//! Interview data structures

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Role of the speaker within an interview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    /// The person conducting the interview
    Interviewer,
    /// The citizen being interviewed
    Participant,
    /// Speaker could not be determined from the transcript
    Unknown,
}

/// One utterance by one speaker within an interview transcript.
///
/// Turns are owned by their [`Interview`] and never mutated after
/// segmentation. `index` is the zero-based sequence position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Zero-based sequence position within the interview
    pub index: usize,
    /// Who is speaking
    pub speaker: SpeakerRole,
    /// The utterance text
    pub text: String,
}

/// Metadata attached to an interview document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterviewMetadata {
    /// When the interview was recorded (from the filename convention)
    pub recorded_at: Option<DateTime<Utc>>,
    /// Recording location, if known
    pub location: Option<String>,
    /// Number of participants, if known
    pub participant_count: Option<u32>,
    /// Path of the source document
    pub source_path: PathBuf,
}

/// A loaded interview. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    /// Stable identifier, taken from the filename
    pub id: String,
    /// The raw document text
    pub raw_text: String,
    /// Document metadata
    pub metadata: InterviewMetadata,
    /// Ordered speaker turns
    pub turns: Vec<Turn>,
}

impl Interview {
    /// Number of turns in this interview
    pub fn total_turns(&self) -> usize {
        self.turns.len()
    }
}

/// Parse the `YYYYMMDD_HHMM_<id>` filename convention.
///
/// Returns the recording timestamp and the interview id. Filenames that do
/// not follow the convention yield `(None, <file stem>)` so nonconforming
/// documents are still loadable.
pub fn parse_document_filename(path: &Path) -> (Option<DateTime<Utc>>, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut parts = stem.splitn(3, '_');
    let (date, time, id) = match (parts.next(), parts.next(), parts.next()) {
        (Some(d), Some(t), Some(id)) if !id.is_empty() => (d, t, id),
        _ => return (None, stem),
    };

    if date.len() != 8 || time.len() != 4 {
        return (None, stem);
    }

    let recorded_at = NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y%m%d %H%M")
        .ok()
        .and_then(|naive| Utc.from_local_datetime(&naive).single());

    match recorded_at {
        Some(ts) => (Some(ts), id.to_string()),
        None => (None, stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use chrono::Timelike;

    #[test]
    fn test_parse_conventional_filename() {
        let (ts, id) = parse_document_filename(Path::new("/data/20240312_1430_ab12.txt"));
        let ts = ts.unwrap();
        assert_eq!(id, "ab12");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 12));
        assert_eq!((ts.hour(), ts.minute()), (14, 30));
    }

    #[test]
    fn test_parse_filename_with_underscored_id() {
        let (ts, id) = parse_document_filename(Path::new("20231101_0900_site_a_007.txt"));
        assert!(ts.is_some());
        assert_eq!(id, "site_a_007");
    }

    #[test]
    fn test_nonconforming_filename_falls_back_to_stem() {
        let (ts, id) = parse_document_filename(Path::new("interview-notes.md"));
        assert!(ts.is_none());
        assert_eq!(id, "interview-notes");

        // Bad date digits keep the whole stem as id
        let (ts, id) = parse_document_filename(Path::new("2024XX12_1430_ab12.txt"));
        assert!(ts.is_none());
        assert_eq!(id, "2024XX12_1430_ab12");
    }

    #[test]
    fn test_speaker_role_serialization() {
        let json = serde_json::to_string(&SpeakerRole::Participant).unwrap();
        assert_eq!(json, "\"participant\"");
    }
}
