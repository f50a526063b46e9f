use crate::analyzer::FULL_MARKS;
use crate::classifier::{classify, strip_noise};
use crate::error::Result;
use crate::levels::LevelConfiguration;
use crate::models::{ResultStatus, ResyncPolicy, StudentRecord, SubjectScore};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

// roll, gender, name (shortest run up to the first subject code), first code
static ROW_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{8})\s+([MF])\s+(.*?)\s+(\d{3})").unwrap());
static SUBJECT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}\b").unwrap());
static MARKS_GRADE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s+([A-D][12])").unwrap());
static RESULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(PASS|FAIL|COMP|ABST)\b").unwrap());

/// Why a two-line window did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reject {
    /// Roll/gender/name/first-code shape not found on line 1
    MalformedHead,
    TooFewSubjectCodes { found: usize, expected: usize },
    TooFewMarks { found: usize, expected: usize },
    MarksOutOfRange { mark: u32 },
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reject::MalformedHead => write!(f, "line does not start with roll, gender and name"),
            Reject::TooFewSubjectCodes { found, expected } => {
                write!(f, "{} subject codes found, {} expected", found, expected)
            }
            Reject::TooFewMarks { found, expected } => {
                write!(f, "{} marks/grade pairs found, {} expected", found, expected)
            }
            Reject::MarksOutOfRange { mark } => {
                write!(f, "mark {} is above {}", mark, FULL_MARKS)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub windows: usize,
    pub accepted: usize,
    pub discarded_lines: usize,
    pub rejects: Vec<(usize, Reject)>, // line number of line 1
}

impl ParseReport {
    pub fn rejected(&self) -> usize {
        self.rejects.len()
    }
}

/// Extracts one student from a record start line and its marks line.
pub fn parse_window(
    line1: &str,
    line2: &str,
    config: &LevelConfiguration,
) -> std::result::Result<StudentRecord, Reject> {
    let head = ROW_HEAD.captures(line1).ok_or(Reject::MalformedHead)?;
    let roll_no = head[1].to_string();
    let gender = head[2].to_string();
    let name = head[3].trim().to_string();

    // The code that closed the name match is enumerated again here.
    let codes: Vec<&str> = SUBJECT_CODE.find_iter(line1).map(|m| m.as_str()).collect();
    let marks: Vec<(u32, &str)> = MARKS_GRADE
        .captures_iter(line2)
        .filter_map(|caps| {
            let mark = caps.get(1)?.as_str().parse::<u32>().ok()?;
            Some((mark, caps.get(2)?.as_str()))
        })
        .collect();

    if codes.len() < config.expected_subjects {
        return Err(Reject::TooFewSubjectCodes {
            found: codes.len(),
            expected: config.expected_subjects,
        });
    }
    if marks.len() < config.expected_subjects {
        return Err(Reject::TooFewMarks {
            found: marks.len(),
            expected: config.expected_subjects,
        });
    }

    if let Some(mark) = marks
        .iter()
        .take(codes.len())
        .map(|(mark, _)| *mark)
        .find(|mark| *mark > FULL_MARKS)
    {
        return Err(Reject::MarksOutOfRange { mark });
    }

    let combined = format!("{} {}", line1, line2);
    let result = RESULT
        .captures(&combined)
        .and_then(|caps| caps.get(1))
        .map(|m| ResultStatus::from_token(m.as_str()))
        .unwrap_or(ResultStatus::Unknown);

    // A repeated code keeps its first position and takes the later mark.
    let mut subjects: Vec<SubjectScore> = Vec::with_capacity(codes.len());
    for (code, (mark, grade)) in codes.iter().zip(marks.iter()) {
        let score = SubjectScore {
            code: code.to_string(),
            label: config.label_for(code),
            marks: *mark,
            grade: grade.to_string(),
        };
        match subjects.iter_mut().find(|s| s.code == score.code) {
            Some(existing) => {
                debug!(roll_no = %roll_no, code = %code, "Repeated subject code");
                *existing = score;
            }
            None => subjects.push(score),
        }
    }

    Ok(StudentRecord {
        roll_no,
        gender,
        name,
        subjects,
        result,
        line_number: 0,
    })
}

/// Reads a bulletin, replacing undecodable bytes instead of failing.
pub fn read_bulletin(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub struct BulletinParser<'a> {
    config: &'a LevelConfiguration,
    resync: ResyncPolicy,
}

impl<'a> BulletinParser<'a> {
    pub fn new(config: &'a LevelConfiguration, resync: ResyncPolicy) -> Self {
        Self { config, resync }
    }

    pub fn parse_file(&self, file_path: &Path) -> Result<(Vec<StudentRecord>, ParseReport)> {
        let content = read_bulletin(file_path)?;
        Ok(self.parse_text(&content))
    }

    /// Walks the noise-free lines two at a time and collects every record found.
    pub fn parse_text(&self, text: &str) -> (Vec<StudentRecord>, ParseReport) {
        let lines = strip_noise(text);
        let mut records = Vec::new();
        let mut report = ParseReport::default();

        let mut i = 0;
        while i + 1 < lines.len() {
            let (line_number, line1) = lines[i];
            let (_, line2) = lines[i + 1];

            if !classify(line1).is_candidate() {
                report.discarded_lines += 1;
                i += 1;
                continue;
            }

            report.windows += 1;
            match parse_window(line1, line2, self.config) {
                Ok(mut record) => {
                    record.line_number = line_number;
                    records.push(record);
                    report.accepted += 1;
                    i += 2;
                }
                Err(reject) => {
                    debug!(line = line_number, reason = %reject, "Rejected record window");
                    i += self.advance_after(&reject);
                    report.rejects.push((line_number, reject));
                }
            }
        }

        (records, report)
    }

    fn advance_after(&self, reject: &Reject) -> usize {
        match (self.resync, reject) {
            (ResyncPolicy::Overlapping, _) => 1,
            (ResyncPolicy::Legacy, Reject::MalformedHead) => 1,
            (ResyncPolicy::Legacy, _) => 2,
        }
    }
}
