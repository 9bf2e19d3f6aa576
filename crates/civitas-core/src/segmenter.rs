//! Turn segmentation for raw transcript text

use crate::interview::SpeakerRole;
use crate::interview::Turn;
use regex::Regex;
use std::sync::OnceLock;

/// Speaker labels that mark the interviewer side of the conversation.
const INTERVIEWER_LABELS: &[&str] = &["q", "i", "int", "interviewer", "moderator", "facilitator"];

/// Speaker labels that mark the participant side of the conversation.
const PARTICIPANT_LABELS: &[&str] = &["a", "p", "r", "participant", "respondent", "citizen"];

fn speaker_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A line starting with a short label followed by ':' opens a new turn,
    // e.g. "Q:", "Interviewer:", "P3:".
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 .\-]{0,24})\s*:\s*(.*)$").unwrap())
}

fn classify_speaker(label: &str) -> SpeakerRole {
    let normalized: String = label
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    if INTERVIEWER_LABELS.contains(&normalized.as_str()) {
        SpeakerRole::Interviewer
    } else if PARTICIPANT_LABELS.contains(&normalized.as_str()) {
        SpeakerRole::Participant
    } else {
        SpeakerRole::Unknown
    }
}

/// Split raw transcript text into an ordered list of speaker turns.
///
/// A turn opens at every speaker-labelled line (`Label: text`); unlabelled
/// lines continue the current turn. Text before the first label becomes a
/// single leading turn with an unknown speaker. Blank lines are dropped.
/// Deterministic: the same input always yields identical turn boundaries.
pub fn segment_turns(raw_text: &str) -> Vec<Turn> {
    let re = speaker_line_re();
    let mut turns: Vec<(SpeakerRole, Vec<String>)> = Vec::new();

    for line in raw_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = re.captures(trimmed) {
            let speaker = classify_speaker(&caps[1]);
            let rest = caps[2].trim().to_string();
            let mut body = Vec::new();
            if !rest.is_empty() {
                body.push(rest);
            }
            turns.push((speaker, body));
        } else {
            match turns.last_mut() {
                Some((_, body)) => body.push(trimmed.to_string()),
                None => turns.push((SpeakerRole::Unknown, vec![trimmed.to_string()])),
            }
        }
    }

    turns
        .into_iter()
        .filter(|(_, body)| !body.is_empty())
        .enumerate()
        .map(|(index, (speaker, body))| Turn {
            index,
            speaker,
            text: body.join(" "),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Q: How long have you lived in the neighborhood?
A: About fifteen years now.
We moved here when my daughter was born.
Q: What would you change first?
A: The bus connections, definitely.";

    #[test]
    fn test_segments_speaker_labelled_lines() {
        let turns = segment_turns(SAMPLE);
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].speaker, SpeakerRole::Interviewer);
        assert_eq!(turns[1].speaker, SpeakerRole::Participant);
        assert_eq!(
            turns[1].text,
            "About fifteen years now. We moved here when my daughter was born."
        );
        assert_eq!(turns[3].index, 3);
    }

    #[test]
    fn test_unlabelled_preamble_becomes_unknown_turn() {
        let turns = segment_turns("Recorded at the community center.\nQ: Shall we begin?");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, SpeakerRole::Unknown);
        assert_eq!(turns[1].speaker, SpeakerRole::Interviewer);
    }

    #[test]
    fn test_named_speakers_classify_as_unknown() {
        let turns = segment_turns("Maria G.: I grew up two streets over.");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker, SpeakerRole::Unknown);
        assert_eq!(turns[0].text, "I grew up two streets over.");
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(segment_turns("").is_empty());
        assert!(segment_turns("\n  \n\t\n").is_empty());
        // A label with no text on the line and no continuation is dropped
        assert!(segment_turns("Q:\n").is_empty());
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let first = segment_turns(SAMPLE);
        let second = segment_turns(SAMPLE);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.text, b.text);
        }
    }
}
