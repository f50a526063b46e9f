use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub level: LevelSelection,
    pub subject_count: Option<usize>,
    // Representative student line(s) pasted from the bulletin
    pub sample_line: String,
    pub input_file: Option<String>,
    pub output_directory: Option<String>,
    pub output_name: Option<String>,
    #[serde(default)]
    pub resync: ResyncPolicy,
    #[serde(default)]
    pub stream_rule: StreamRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelSelection {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "lower")]
    Lower,
    #[serde(rename = "upper")]
    Upper,
}

/// How the cursor moves after a two-line window is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResyncPolicy {
    /// Advance one line when line1 is not a record start, two lines otherwise.
    #[default]
    #[serde(rename = "legacy")]
    Legacy,
    /// Always advance one line, so the line after a bad window is retried.
    #[serde(rename = "overlapping")]
    Overlapping,
}

/// Which subjects decide an upper-level student's stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamRule {
    /// First stream whose main-subject set shares any label with the record.
    #[default]
    #[serde(rename = "intersecting")]
    Intersecting,
    /// First stream for which the record takes a subject no other stream lists.
    #[serde(rename = "defining")]
    Defining,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: LevelSelection::Auto,
            subject_count: None,
            sample_line: "".to_string(),
            input_file: Some("bulletin.txt".to_string()),
            output_directory: Some("output".to_string()),
            output_name: Some("results".to_string()),
            resync: ResyncPolicy::Legacy,
            stream_rule: StreamRule::Intersecting,
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// Examination stage. Lower has a fixed main-subject set, upper a stream-dependent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Lower,
    Upper,
}

impl Level {
    pub fn name(&self) -> &str {
        match self {
            Level::Lower => "Grade 10",
            Level::Upper => "Grade 12",
        }
    }

    pub fn other(&self) -> Level {
        match self {
            Level::Lower => Level::Upper,
            Level::Upper => Level::Lower,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Pass,
    Fail,
    Compartment,
    Absent,
    Unknown,
}

impl ResultStatus {
    /// Maps a bulletin result token (any case) to a status.
    pub fn from_token(token: &str) -> Self {
        match token.to_uppercase().as_str() {
            "PASS" => ResultStatus::Pass,
            "FAIL" => ResultStatus::Fail,
            "COMP" => ResultStatus::Compartment,
            "ABST" => ResultStatus::Absent,
            _ => ResultStatus::Unknown,
        }
    }

    /// Token as printed on the bulletin; empty when no result was found.
    pub fn code(&self) -> &str {
        match self {
            ResultStatus::Pass => "PASS",
            ResultStatus::Fail => "FAIL",
            ResultStatus::Compartment => "COMP",
            ResultStatus::Absent => "ABST",
            ResultStatus::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub code: String,
    pub label: String,
    pub marks: u32,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub roll_no: String,
    pub gender: String,
    pub name: String,
    pub subjects: Vec<SubjectScore>, // bulletin order
    pub result: ResultStatus,
    pub line_number: usize,
}

impl StudentRecord {
    pub fn marks_for(&self, label: &str) -> Option<u32> {
        self.subjects.iter().find(|s| s.label == label).map(|s| s.marks)
    }

    pub fn grade_for(&self, label: &str) -> Option<&str> {
        self.subjects
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.grade.as_str())
    }

    pub fn has_subject(&self, label: &str) -> bool {
        self.subjects.iter().any(|s| s.label == label)
    }
}

/// Upper-level subject combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stream {
    Pcm,
    Pcb,
    Commerce,
    Humanities,
}

impl Stream {
    /// Detection order; the last entry is the fallback.
    pub const PRIORITY: [Stream; 4] = [
        Stream::Pcm,
        Stream::Pcb,
        Stream::Commerce,
        Stream::Humanities,
    ];

    pub fn name(&self) -> &str {
        match self {
            Stream::Pcm => "PCM",
            Stream::Pcb => "PCB",
            Stream::Commerce => "Commerce",
            Stream::Humanities => "Humanities",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub record: StudentRecord,
    pub total: u32,
    pub percentage: Option<f64>,
    pub stream: Option<Stream>,
    pub main_total: u32,
    pub main_percentage: Option<f64>,
    pub best_total: Option<u32>,
    pub best_percentage: Option<f64>,
    // Filled in by the batch ranking pass
    pub rank: Option<u32>,
    pub main_rank: Option<u32>,
    pub best_rank: Option<u32>,
}

/// Derived value a batch can be ranked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankField {
    Percentage,
    MainPercentage,
    BestPercentage,
}

impl AggregatedRecord {
    pub fn value_of(&self, field: RankField) -> Option<f64> {
        match field {
            RankField::Percentage => self.percentage,
            RankField::MainPercentage => self.main_percentage,
            RankField::BestPercentage => self.best_percentage,
        }
    }

    pub fn set_rank(&mut self, field: RankField, rank: Option<u32>) {
        match field {
            RankField::Percentage => self.rank = rank,
            RankField::MainPercentage => self.main_rank = rank,
            RankField::BestPercentage => self.best_rank = rank,
        }
    }

    pub fn rank_of(&self, field: RankField) -> Option<u32> {
        match field {
            RankField::Percentage => self.rank,
            RankField::MainPercentage => self.main_rank,
            RankField::BestPercentage => self.best_rank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StatValue {
    Count(u32),
    Value(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub statistic: String,
    pub values: Vec<(String, StatValue)>, // subject label -> value
}

impl SummaryRow {
    pub fn value_for(&self, label: &str) -> Option<StatValue> {
        self.values
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("level = \"auto\""));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.level, LevelSelection::Auto);
        assert_eq!(back.resync, ResyncPolicy::Legacy);
    }

    #[test]
    fn resync_defaults_when_missing() {
        let config: Config = toml::from_str("level = \"upper\"\nsample_line = \"x\"\n").unwrap();
        assert_eq!(config.level, LevelSelection::Upper);
        assert_eq!(config.resync, ResyncPolicy::Legacy);
        assert_eq!(config.stream_rule, StreamRule::Intersecting);
        assert!(config.subject_count.is_none());
    }

    #[test]
    fn stream_rule_reads_from_toml() {
        let config: Config =
            toml::from_str("level = \"upper\"\nsample_line = \"x\"\nstream_rule = \"defining\"\n")
                .unwrap();
        assert_eq!(config.stream_rule, StreamRule::Defining);
    }

    #[test]
    fn result_tokens_are_case_insensitive() {
        assert_eq!(ResultStatus::from_token("pass"), ResultStatus::Pass);
        assert_eq!(ResultStatus::from_token("Comp"), ResultStatus::Compartment);
        assert_eq!(ResultStatus::from_token("ABST"), ResultStatus::Absent);
        assert_eq!(ResultStatus::from_token("XYZ").code(), "");
    }
}
