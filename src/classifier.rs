use regex::Regex;
use std::sync::LazyLock;

/// Administrative line kinds found between student records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    DateStamp,
    ColumnHeader,
    Separator,
    SchoolBanner,
    CandidateFooter,
    PageBreak,
    Blank,
    RegionBanner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Noise(NoiseKind),
    /// Starts with an 8-digit roll number; may open a record window
    Candidate,
    /// Anything else (preamble, marks lines seen out of place)
    Discarded,
}

impl LineClass {
    pub fn is_noise(&self) -> bool {
        matches!(self, LineClass::Noise(_))
    }

    pub fn is_candidate(&self) -> bool {
        matches!(self, LineClass::Candidate)
    }
}

// Checked in order; the first hit decides the kind.
static NOISE_PATTERNS: LazyLock<Vec<(NoiseKind, Regex)>> = LazyLock::new(|| {
    [
        (NoiseKind::DateStamp, r"^DATE:-"),
        (NoiseKind::ColumnHeader, r"^ROLL\s+F"),
        (NoiseKind::ColumnHeader, r"^NO\s+L"),
        (NoiseKind::Separator, r"^-+$"),
        (NoiseKind::SchoolBanner, r"^SCHOOL\s+:\s+-"),
        (NoiseKind::CandidateFooter, r"^TOTAL CANDIDATES"),
        (NoiseKind::PageBreak, r"^\f"),
        (NoiseKind::Blank, r"^\s*$"),
        (NoiseKind::RegionBanner, r"^REGION:"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
    .collect()
});

static CANDIDATE_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{8}\s").unwrap());

pub fn classify(line: &str) -> LineClass {
    if let Some((kind, _)) = NOISE_PATTERNS.iter().find(|(_, re)| re.is_match(line)) {
        return LineClass::Noise(*kind);
    }

    if CANDIDATE_START.is_match(line) {
        LineClass::Candidate
    } else {
        LineClass::Discarded
    }
}

/// Trims every physical line and drops the administrative ones, keeping
/// each surviving line's 1-based position in the input text.
pub fn strip_noise(text: &str) -> Vec<(usize, &str)> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            // trim() also eats a leading form feed, so page breaks show up as blanks here
            let line = raw.trim();
            if classify(line).is_noise() {
                None
            } else {
                Some((idx + 1, line))
            }
        })
        .collect()
}
