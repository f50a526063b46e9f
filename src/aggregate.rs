use crate::levels::{LevelConfiguration, MainSubjects};
use crate::models::{AggregatedRecord, Level, Stream, StreamRule, StudentRecord};
use std::collections::BTreeSet;

/// Number of best subjects counted for the lower level's "Top 5" figures.
pub const BEST_OF: usize = 5;

/// Rounds to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Average mark as a percentage; `None` when there is nothing to divide by.
pub fn percentage(total: u32, count: usize) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(round2(total as f64 / count as f64))
    }
}

/// Subjects of one stream's set that no other stream's set lists.
/// Shared core subjects (English, for one) say nothing about the stream.
fn defining_subjects<'a>(
    stream: Stream,
    sets: &'a [(Stream, BTreeSet<String>)],
) -> BTreeSet<&'a str> {
    let Some((_, own)) = sets.iter().find(|(s, _)| *s == stream) else {
        return BTreeSet::new();
    };
    own.iter()
        .filter(|label| {
            !sets
                .iter()
                .any(|(other, set)| *other != stream && set.contains(*label))
        })
        .map(String::as_str)
        .collect()
}

/// First stream, in priority order, that the record matches under `rule`.
/// Falls back to the last stream when none matches.
pub fn detect_stream(
    record: &StudentRecord,
    sets: &[(Stream, BTreeSet<String>)],
    rule: StreamRule,
) -> Option<Stream> {
    sets.iter()
        .find(|(stream, set)| match rule {
            StreamRule::Intersecting => record.subjects.iter().any(|s| set.contains(&s.label)),
            StreamRule::Defining => {
                let defining = defining_subjects(*stream, sets);
                record.subjects.iter().any(|s| defining.contains(s.label.as_str()))
            }
        })
        .or_else(|| sets.last())
        .map(|(stream, _)| *stream)
}

fn main_marks(record: &StudentRecord, main_set: Option<&BTreeSet<String>>) -> Vec<u32> {
    match main_set {
        Some(set) => record
            .subjects
            .iter()
            .filter(|s| set.contains(&s.label))
            .map(|s| s.marks)
            .collect(),
        None => Vec::new(),
    }
}

pub fn aggregate(record: StudentRecord, config: &LevelConfiguration) -> AggregatedRecord {
    let total: u32 = record.subjects.iter().map(|s| s.marks).sum();
    let overall = percentage(total, record.subjects.len());

    let stream = match &config.main_subjects {
        MainSubjects::Fixed(_) => None,
        MainSubjects::ByStream(sets) => detect_stream(&record, sets, config.stream_rule),
    };

    let main = main_marks(&record, config.main_set_for(stream));
    let main_total: u32 = main.iter().sum();
    let main_percentage = percentage(main_total, main.len());

    let (best_total, best_percentage) = match config.level {
        Level::Lower => {
            let mut marks: Vec<u32> = record.subjects.iter().map(|s| s.marks).collect();
            marks.sort_unstable_by(|a, b| b.cmp(a));
            marks.truncate(BEST_OF);
            if marks.is_empty() {
                (None, None)
            } else {
                let best: u32 = marks.iter().sum();
                // divided by the fixed N even when fewer subjects were parsed
                (Some(best), Some(round2(best as f64 / BEST_OF as f64)))
            }
        }
        Level::Upper => (None, None),
    };

    AggregatedRecord {
        record,
        total,
        percentage: overall,
        stream,
        main_total,
        main_percentage,
        best_total,
        best_percentage,
        rank: None,
        main_rank: None,
        best_rank: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResultStatus, SubjectScore};

    fn record(subjects: &[(&str, u32)]) -> StudentRecord {
        StudentRecord {
            roll_no: "12345678".to_string(),
            gender: "F".to_string(),
            name: "TEST".to_string(),
            subjects: subjects
                .iter()
                .map(|(label, marks)| SubjectScore {
                    code: label.rsplit('-').next().unwrap_or_default().to_string(),
                    label: label.to_string(),
                    marks: *marks,
                    grade: "A1".to_string(),
                })
                .collect(),
            result: ResultStatus::Pass,
            line_number: 1,
        }
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(round2(83.4), 83.4);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(200.0 / 3.0), 66.67);
    }

    #[test]
    fn upper_totals_and_stream() {
        let config = LevelConfiguration::for_level(Level::Upper, None);
        let agg = aggregate(
            record(&[("ENG-301", 88), ("PHY-042", 76), ("CHE-043", 91), ("MAT-041", 67), ("PHED-048", 95)]),
            &config,
        );
        assert_eq!(agg.total, 417);
        assert_eq!(agg.percentage, Some(83.4));
        assert_eq!(agg.stream, Some(Stream::Pcm));
        assert_eq!(agg.main_total, 417);
        assert_eq!(agg.main_percentage, Some(83.4));
        assert_eq!(agg.best_total, None);
    }

    #[test]
    fn first_intersecting_stream_wins() {
        let config = LevelConfiguration::for_level(Level::Upper, None);
        // English is in every stream's set, so PCM claims the commerce student
        let commerce = aggregate(
            record(&[("ENG-301", 70), ("ACC-055", 80), ("BST-054", 90), ("ECO-030", 60), ("PHED-048", 100)]),
            &config,
        );
        assert_eq!(commerce.stream, Some(Stream::Pcm));
        assert_eq!(commerce.main_total, 170);
        assert_eq!(commerce.main_percentage, Some(85.0));
        assert_eq!(commerce.percentage, Some(80.0));

        let painter = aggregate(record(&[("PAINT-049", 90), ("HIS-027", 70)]), &config);
        assert_eq!(painter.stream, Some(Stream::Humanities));
        assert_eq!(painter.main_total, 160);

        let unmapped = aggregate(record(&[("SUB-999", 50)]), &config);
        assert_eq!(unmapped.stream, Some(Stream::Humanities));
        assert_eq!(unmapped.main_percentage, None);
    }

    #[test]
    fn defining_rule_ignores_shared_subjects() {
        let config =
            LevelConfiguration::for_level(Level::Upper, None).with_stream_rule(StreamRule::Defining);
        let commerce = aggregate(
            record(&[("ENG-301", 64), ("ECO-030", 70), ("BST-054", 80), ("ACC-055", 90), ("SUB-999", 50)]),
            &config,
        );
        assert_eq!(commerce.stream, Some(Stream::Commerce));
        assert_eq!(commerce.main_total, 304);
        assert_eq!(commerce.main_percentage, Some(76.0));
        assert_eq!(commerce.percentage, Some(70.8));

        let biology = aggregate(
            record(&[("ENG-301", 70), ("PHY-042", 70), ("CHE-043", 70), ("BIO-044", 90)]),
            &config,
        );
        assert_eq!(biology.stream, Some(Stream::Pcb));

        // mathematics is checked before biology
        let both = aggregate(record(&[("BIO-044", 90), ("MAT-041", 80)]), &config);
        assert_eq!(both.stream, Some(Stream::Pcm));

        let nothing = aggregate(record(&[("ENG-301", 50), ("SUB-999", 50)]), &config);
        assert_eq!(nothing.stream, Some(Stream::Humanities));
        assert_eq!(nothing.main_total, 50);
        assert_eq!(nothing.main_percentage, Some(50.0));
    }

    #[test]
    fn lower_main_and_best_five() {
        let config = LevelConfiguration::for_level(Level::Lower, None);
        let agg = aggregate(
            record(&[
                ("ENG-184", 90),
                ("HND-085", 80),
                ("MAT-041", 70),
                ("SCI-086", 60),
                ("SST-087", 50),
                ("IT-402", 100),
            ]),
            &config,
        );
        assert_eq!(agg.stream, None);
        assert_eq!(agg.total, 450);
        assert_eq!(agg.percentage, Some(75.0));
        // IT-402 is not a main subject
        assert_eq!(agg.main_total, 350);
        assert_eq!(agg.main_percentage, Some(70.0));
        assert_eq!(agg.best_total, Some(400));
        assert_eq!(agg.best_percentage, Some(80.0));
    }

    #[test]
    fn empty_subjects_leave_percentages_blank() {
        let config = LevelConfiguration::for_level(Level::Lower, Some(0));
        let agg = aggregate(record(&[]), &config);
        assert_eq!(agg.total, 0);
        assert_eq!(agg.percentage, None);
        assert_eq!(agg.main_percentage, None);
        assert_eq!(agg.best_percentage, None);
    }
}
