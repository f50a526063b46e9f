// Result sheet processing: bulletin text in, ranked student and subject tables out.

pub mod aggregate;
pub mod analyzer;
pub mod classifier;
pub mod error;
pub mod levels;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod telemetry;

pub use aggregate::{aggregate, round2};
pub use analyzer::{rank, summarize, RankedBatch, ResultAnalyzer};
pub use classifier::{classify, LineClass, NoiseKind};
pub use error::{Mismatch, ResultSheetError};
pub use levels::{resolve, validate, LevelConfiguration, MainSubjects};
pub use models::{
    AggregatedRecord, Config, Level, LevelSelection, RankField, ResultStatus, ResyncPolicy,
    Stream, StreamRule, StudentRecord, SubjectScore, SummaryRow,
};
pub use parser::{parse_window, read_bulletin, BulletinParser, ParseReport, Reject};
pub use pipeline::{process, run, BatchAnalysis};
pub use report::{build_record_table, build_summary_table, Cell, CsvSink, Table, TableSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
