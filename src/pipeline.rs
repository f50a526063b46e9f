use crate::aggregate::aggregate;
use crate::analyzer::{RankedBatch, ResultAnalyzer};
use crate::error::Result;
use crate::levels::{self, LevelConfiguration};
use crate::models::{Config, ResyncPolicy};
use crate::parser::{BulletinParser, ParseReport};
use tracing::info;

#[derive(Debug, Clone)]
pub struct BatchAnalysis {
    pub config: LevelConfiguration,
    pub batch: RankedBatch,
    pub report: ParseReport,
}

/// Parses, aggregates and ranks one bulletin under an already resolved level.
pub fn process(text: &str, config: &LevelConfiguration, resync: ResyncPolicy) -> BatchAnalysis {
    let (records, report) = BulletinParser::new(config, resync).parse_text(text);
    info!(
        accepted = report.accepted,
        rejected = report.rejected(),
        "Parsed bulletin"
    );

    let aggregated: Vec<_> = records.into_iter().map(|r| aggregate(r, config)).collect();

    // Ranks and statistics need the complete batch.
    let batch = ResultAnalyzer::new(config).analyze(aggregated);

    BatchAnalysis {
        config: config.clone(),
        batch,
        report,
    }
}

/// Resolves the level from the settings, checks the bulletin against it and
/// processes it. A mismatch stops the run before anything is parsed.
pub fn run(settings: &Config, text: &str) -> Result<BatchAnalysis> {
    let config = levels::resolve(settings.level, settings.subject_count, &settings.sample_line)?
        .with_stream_rule(settings.stream_rule);
    levels::validate(&config, text, &settings.sample_line)?;
    Ok(process(text, &config, settings.resync))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultSheetError;
    use crate::models::{Level, LevelSelection};

    const BULLETIN: &str = "\
DATE:- 20/05/2024
SCHOOL :  - 10101 SPRINGFIELD PUBLIC SCHOOL
ROLL   F  NAME            SUB SUB SUB SUB SUB        IA  IA  IA  RESULT
--------------------------------------------------------------------------
12345678 M JOHN DOE      301 042 043 041 048   A1 A1 A1 PASS
88 A1 76 B1 91 A1 67 B2 95 A1
12345679 F PRIYA SHARMA  301 042 043 044 048   A1 A1 A1 PASS
75 B1 80 A2 75 B1 70 B2 75 B1
12345680 M RAHUL VERMA   301 042 043 041 048   A1 A1 A1 PASS
75 B1 75 B1 75 B1 75 B1 75 B1
TOTAL CANDIDATES :   3
";

    fn settings(level: LevelSelection) -> Config {
        Config {
            level,
            sample_line: "12345678 M JOHN DOE 301 042 043 041 048 A1 A1 A1 PASS".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn runs_the_whole_bulletin() {
        let analysis = run(&settings(LevelSelection::Auto), BULLETIN).unwrap();
        assert_eq!(analysis.config.level, Level::Upper);
        assert_eq!(analysis.report.accepted, 3);
        assert_eq!(analysis.report.rejected(), 0);

        let ranks: Vec<Option<u32>> = analysis.batch.records.iter().map(|r| r.rank).collect();
        // 83.4, 75.0, 75.0
        assert_eq!(ranks, vec![Some(1), Some(2), Some(2)]);
        assert_eq!(analysis.batch.summary.len(), 6);
    }

    #[test]
    fn wrong_level_stops_before_parsing() {
        let result = run(&settings(LevelSelection::Lower), BULLETIN);
        assert!(matches!(result, Err(ResultSheetError::ConfigurationMismatch(_))));
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        let config = LevelConfiguration::for_level(Level::Upper, None);
        let analysis = process("DATE:- 20/05/2024\n-----\n", &config, ResyncPolicy::Legacy);
        assert!(analysis.batch.records.is_empty());
        assert!(analysis.batch.summary.is_empty());
        assert!(analysis.batch.subjects.is_empty());
    }
}
