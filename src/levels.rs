use crate::classifier::classify;
use crate::error::{Mismatch, Result, ResultSheetError};
use crate::models::{Level, LevelSelection, Stream, StreamRule};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{info, warn};

// Code -> label tables, listed in the column order used for output.
const LOWER_SUBJECTS: &[(&str, &str)] = &[
    ("184", "ENG-184"),
    ("085", "HND-085"),
    ("402", "IT-402"),
    ("041", "MAT-041"),
    ("241", "MAT-241"),
    ("086", "SCI-086"),
    ("122", "SNK-122"),
    ("087", "SST-087"),
];

const UPPER_SUBJECTS: &[(&str, &str)] = &[
    ("301", "ENG-301"),
    ("042", "PHY-042"),
    ("043", "CHE-043"),
    ("041", "MAT-041"),
    ("044", "BIO-044"),
    ("030", "ECO-030"),
    ("054", "BST-054"),
    ("055", "ACC-055"),
    ("027", "HIS-027"),
    ("028", "POL_SC-028"),
    ("029", "GEO-029"),
    ("049", "PAINT-049"),
    ("048", "PHED-048"),
    ("065", "IP-065"),
];

const LOWER_MAIN: &[&str] = &[
    "MAT-041", "MAT-241", "SCI-086", "SST-087", "ENG-184", "HND-085", "SNK-122",
];
const PCM_MAIN: &[&str] = &["ENG-301", "PHY-042", "CHE-043", "MAT-041", "PHED-048", "IP-065"];
const PCB_MAIN: &[&str] = &["ENG-301", "PHY-042", "CHE-043", "BIO-044", "PHED-048", "IP-065"];
const COMMERCE_MAIN: &[&str] = &["ENG-301", "ECO-030", "BST-054", "ACC-055", "PHED-048", "IP-065"];
const HUMANITIES_MAIN: &[&str] = &["ENG-301", "HIS-027", "POL_SC-028", "GEO-029", "PAINT-049", "IP-065"];

pub const LOWER_DEFAULT_SUBJECTS: usize = 6;
pub const UPPER_DEFAULT_SUBJECTS: usize = 5;

static SUBJECT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}\b").unwrap());

// Three internal-assessment grades followed by the result
static UPPER_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-D][1-2])\s+([A-D][1-2])\s+([A-D][1-2])\s+(PASS|FAIL|COMP|ABST)").unwrap()
});
static RESULT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(PASS|FAIL|COMP|ABST)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainSubjects {
    Fixed(BTreeSet<String>),
    /// Alternatives in detection priority order
    ByStream(Vec<(Stream, BTreeSet<String>)>),
}

/// Everything the parser and aggregator need to know about one level.
/// Resolved once per run and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelConfiguration {
    pub level: Level,
    subjects: Vec<(String, String)>,
    pub main_subjects: MainSubjects,
    pub expected_subjects: usize,
    pub stream_rule: StreamRule,
}

fn label_set(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

fn stream_main(stream: Stream) -> &'static [&'static str] {
    match stream {
        Stream::Pcm => PCM_MAIN,
        Stream::Pcb => PCB_MAIN,
        Stream::Commerce => COMMERCE_MAIN,
        Stream::Humanities => HUMANITIES_MAIN,
    }
}

fn subject_table(level: Level) -> &'static [(&'static str, &'static str)] {
    match level {
        Level::Lower => LOWER_SUBJECTS,
        Level::Upper => UPPER_SUBJECTS,
    }
}

/// All codes a level knows about.
pub fn level_codes(level: Level) -> BTreeSet<&'static str> {
    subject_table(level).iter().map(|(code, _)| *code).collect()
}

impl LevelConfiguration {
    pub fn for_level(level: Level, subject_count: Option<usize>) -> Self {
        let subjects = subject_table(level)
            .iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect();

        let (main_subjects, default_count) = match level {
            Level::Lower => (MainSubjects::Fixed(label_set(LOWER_MAIN)), LOWER_DEFAULT_SUBJECTS),
            Level::Upper => (
                MainSubjects::ByStream(
                    Stream::PRIORITY
                        .iter()
                        .map(|stream| (*stream, label_set(stream_main(*stream))))
                        .collect(),
                ),
                UPPER_DEFAULT_SUBJECTS,
            ),
        };

        Self {
            level,
            subjects,
            main_subjects,
            expected_subjects: subject_count.unwrap_or(default_count),
            stream_rule: StreamRule::default(),
        }
    }

    pub fn with_stream_rule(mut self, rule: StreamRule) -> Self {
        self.stream_rule = rule;
        self
    }

    /// Label for a subject code; unknown codes keep the code in their label.
    pub fn label_for(&self, code: &str) -> String {
        self.subjects
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| format!("SUB-{}", code))
    }

    pub fn is_mapped_label(&self, label: &str) -> bool {
        self.subjects.iter().any(|(_, l)| l == label)
    }

    /// Mapped labels in canonical output order.
    pub fn canonical_labels(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|(_, label)| label.as_str())
    }

    pub fn codes(&self) -> BTreeSet<&str> {
        self.subjects.iter().map(|(code, _)| code.as_str()).collect()
    }

    pub fn main_set_for(&self, stream: Option<Stream>) -> Option<&BTreeSet<String>> {
        match (&self.main_subjects, stream) {
            (MainSubjects::Fixed(set), _) => Some(set),
            (MainSubjects::ByStream(sets), Some(stream)) => {
                sets.iter().find(|(s, _)| *s == stream).map(|(_, set)| set)
            }
            (MainSubjects::ByStream(_), None) => None,
        }
    }
}

/// Guesses the level from a pasted student line.
pub fn infer_level(sample: &str) -> Level {
    if UPPER_SIGNATURE.is_match(sample) {
        Level::Upper
    } else {
        if !RESULT_TOKEN.is_match(sample) {
            warn!("Sample text has no result token, assuming {}", Level::Lower);
        }
        Level::Lower
    }
}

pub fn resolve(
    selection: LevelSelection,
    subject_count: Option<usize>,
    sample: &str,
) -> Result<LevelConfiguration> {
    let level = match selection {
        LevelSelection::Lower => Level::Lower,
        LevelSelection::Upper => Level::Upper,
        LevelSelection::Auto => {
            if sample.trim().is_empty() {
                return Err(ResultSheetError::MissingSample);
            }
            infer_level(sample)
        }
    };

    let config = LevelConfiguration::for_level(level, subject_count);
    info!(
        level = %config.level,
        expected_subjects = config.expected_subjects,
        "Resolved level configuration"
    );
    Ok(config)
}

pub fn extract_codes(text: &str) -> BTreeSet<String> {
    SUBJECT_CODE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// First line of the file that could open a student record.
pub fn first_candidate_line(file_text: &str) -> Option<&str> {
    file_text
        .lines()
        .map(str::trim)
        .find(|line| classify(line).is_candidate())
}

/// Checks the file and the sample against the chosen level before any parsing.
pub fn validate(config: &LevelConfiguration, file_text: &str, sample: &str) -> Result<()> {
    if sample.trim().is_empty() {
        return Err(ResultSheetError::MissingSample);
    }
    let first_line = first_candidate_line(file_text).ok_or(ResultSheetError::NoCandidateLine)?;

    let expected = config.codes();
    let other = level_codes(config.level.other());
    let shared: BTreeSet<&str> = expected.intersection(&other).copied().collect();

    let in_file = extract_codes(first_line);
    let in_sample = extract_codes(sample);

    let wrong = |found: &BTreeSet<String>| -> Vec<String> {
        found
            .iter()
            .filter(|code| other.contains(code.as_str()) && !shared.contains(code.as_str()))
            .cloned()
            .collect()
    };
    let has_valid = |found: &BTreeSet<String>| found.iter().any(|code| expected.contains(code.as_str()));

    let mismatch = Mismatch {
        level: config.level,
        wrong_in_file: wrong(&in_file),
        wrong_in_sample: wrong(&in_sample),
        no_valid_in_file: !has_valid(&in_file),
        no_valid_in_sample: !has_valid(&in_sample),
    };

    if mismatch.wrong_in_file.is_empty()
        && mismatch.wrong_in_sample.is_empty()
        && !mismatch.no_valid_in_file
        && !mismatch.no_valid_in_sample
    {
        Ok(())
    } else {
        Err(ResultSheetError::ConfigurationMismatch(mismatch))
    }
}
