use crate::aggregate::round2;
use crate::levels::LevelConfiguration;
use crate::models::{AggregatedRecord, Level, RankField, StatValue, SummaryRow};

/// Marks at or above this count as a distinction.
pub const DISTINCTION_MARKS: u32 = 75;
pub const FULL_MARKS: u32 = 100;

pub const HIGHEST: &str = "Highest in Subject";
pub const LOWEST: &str = "Lowest in Subject";
pub const AVERAGE: &str = "Average in Subject";
pub const DISTINCTIONS: &str = "Distinction in Subject";
pub const DISTINCTION_PERCENT: &str = "Distinction in Percent";
pub const FULL_MARKS_COUNT: &str = "Obtained 100 out of 100";

/// Fields ranked for each level, in output order.
pub fn rank_fields(level: Level) -> &'static [RankField] {
    match level {
        Level::Lower => &[RankField::MainPercentage, RankField::BestPercentage],
        Level::Upper => &[RankField::Percentage, RankField::MainPercentage],
    }
}

/// Dense rank over `field`, highest value first. Ties share a rank and the
/// next lower value gets the following rank. Records with no value get no rank.
pub fn rank(batch: &mut [AggregatedRecord], field: RankField) {
    let mut distinct: Vec<f64> = batch.iter().filter_map(|r| r.value_of(field)).collect();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup();

    for record in batch.iter_mut() {
        let rank = record.value_of(field).and_then(|value| {
            // sorted descending, so compare the target against each entry
            distinct
                .binary_search_by(|d| value.total_cmp(d))
                .ok()
                .map(|pos| pos as u32 + 1)
        });
        record.set_rank(field, rank);
    }
}

/// Subject labels present anywhere in the batch: mapped labels in the
/// level's canonical order, then unmapped ones in first-seen order.
pub fn subjects_in_batch(batch: &[AggregatedRecord], config: &LevelConfiguration) -> Vec<String> {
    let present = |label: &str| batch.iter().any(|r| r.record.has_subject(label));

    let mut labels: Vec<String> = config
        .canonical_labels()
        .filter(|label| present(label))
        .map(str::to_string)
        .collect();

    for record in batch {
        for subject in &record.record.subjects {
            if !config.is_mapped_label(&subject.label) && !labels.contains(&subject.label) {
                labels.push(subject.label.clone());
            }
        }
    }

    labels
}

struct SubjectStats {
    highest: u32,
    lowest: u32,
    average: f64,
    distinctions: u32,
    full_marks: u32,
}

impl SubjectStats {
    fn from_marks(marks: &[u32]) -> Self {
        let sum: u32 = marks.iter().sum();
        Self {
            highest: marks.iter().copied().max().unwrap_or(0),
            lowest: marks.iter().copied().min().unwrap_or(0),
            average: if marks.is_empty() {
                0.0
            } else {
                round2(sum as f64 / marks.len() as f64)
            },
            distinctions: marks.iter().filter(|m| **m >= DISTINCTION_MARKS).count() as u32,
            full_marks: marks.iter().filter(|m| **m == FULL_MARKS).count() as u32,
        }
    }
}

/// Per-subject statistics across the whole batch.
pub fn summarize(batch: &[AggregatedRecord], subjects: &[String]) -> Vec<SummaryRow> {
    if batch.is_empty() || subjects.is_empty() {
        return Vec::new();
    }

    let stats: Vec<(&String, SubjectStats)> = subjects
        .iter()
        .map(|label| {
            let marks: Vec<u32> = batch.iter().filter_map(|r| r.record.marks_for(label)).collect();
            (label, SubjectStats::from_marks(&marks))
        })
        .collect();
    let batch_size = batch.len() as f64;

    let row = |statistic: &str, value: fn(&SubjectStats, f64) -> StatValue| SummaryRow {
        statistic: statistic.to_string(),
        values: stats
            .iter()
            .map(|(label, s)| ((*label).clone(), value(s, batch_size)))
            .collect(),
    };

    vec![
        row(HIGHEST, |s, _| StatValue::Count(s.highest)),
        row(LOWEST, |s, _| StatValue::Count(s.lowest)),
        row(AVERAGE, |s, _| StatValue::Value(s.average)),
        row(DISTINCTIONS, |s, _| StatValue::Count(s.distinctions)),
        // share of the whole batch, not of the students taking the subject
        row(DISTINCTION_PERCENT, |s, n| {
            StatValue::Value(round2(s.distinctions as f64 * 100.0 / n))
        }),
        row(FULL_MARKS_COUNT, |s, _| StatValue::Count(s.full_marks)),
    ]
}

pub struct ResultAnalyzer<'a> {
    pub config: &'a LevelConfiguration,
}

#[derive(Debug, Clone)]
pub struct RankedBatch {
    pub records: Vec<AggregatedRecord>,
    pub subjects: Vec<String>,
    pub summary: Vec<SummaryRow>,
}

impl<'a> ResultAnalyzer<'a> {
    pub fn new(config: &'a LevelConfiguration) -> Self {
        Self { config }
    }

    /// Batch-wide pass; only call once every record has been aggregated.
    pub fn analyze(&self, mut records: Vec<AggregatedRecord>) -> RankedBatch {
        // Step 1: dense ranks for the level's ranked fields
        for field in rank_fields(self.config.level) {
            rank(&mut records, *field);
        }

        // Step 2: subjects present, canonical order first
        let subjects = subjects_in_batch(&records, self.config);

        // Step 3: per-subject statistics
        let summary = summarize(&records, &subjects);

        RankedBatch {
            records,
            subjects,
            summary,
        }
    }
}
