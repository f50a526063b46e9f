use crate::analyzer::RankedBatch;
use crate::error::Result;
use crate::models::{AggregatedRecord, Level, RankField, StatValue, SummaryRow};
use csv::Writer;
use std::fs;
use std::path::{Path, PathBuf};

/// A typed table cell. Sinks must keep numbers numeric and text textual.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(f64),
    Blank,
}

impl Cell {
    fn text(value: &str) -> Self {
        Cell::Text(value.to_string())
    }

    fn optional_number(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Blank)
    }

    fn optional_integer<T: Into<i64>>(value: Option<T>) -> Self {
        value.map(|v| Cell::Integer(v.into())).unwrap_or(Cell::Blank)
    }

    pub fn render(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Integer(value) => value.to_string(),
            Cell::Number(value) => format!("{:.2}", value),
            Cell::Blank => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

fn grade_header(label: &str) -> String {
    format!("{}-G", label)
}

fn rank_header(field: RankField) -> &'static str {
    match field {
        RankField::Percentage => "Rank",
        RankField::MainPercentage => "Main % Rank",
        RankField::BestPercentage => "Top 5 % Rank",
    }
}

fn result_headers(level: Level) -> Vec<&'static str> {
    match level {
        Level::Lower => vec![
            "Result",
            "Total",
            "Percentage",
            "Main Total",
            "Main %",
            rank_header(RankField::MainPercentage),
            "Top 5 Total",
            "Top 5 %",
            rank_header(RankField::BestPercentage),
        ],
        Level::Upper => vec![
            "Result",
            "Total",
            "Percentage",
            rank_header(RankField::Percentage),
            "Stream",
            "Main Total",
            "Main %",
            rank_header(RankField::MainPercentage),
        ],
    }
}

fn result_cells(level: Level, record: &AggregatedRecord) -> Vec<Cell> {
    let result = Cell::text(record.record.result.code());
    let total = Cell::Integer(record.total.into());
    let percentage = Cell::optional_number(record.percentage);
    let main_total = Cell::Integer(record.main_total.into());
    let main_percentage = Cell::optional_number(record.main_percentage);
    let main_rank = Cell::optional_integer(record.main_rank);

    match level {
        Level::Lower => vec![
            result,
            total,
            percentage,
            main_total,
            main_percentage,
            main_rank,
            Cell::optional_integer(record.best_total),
            Cell::optional_number(record.best_percentage),
            Cell::optional_integer(record.best_rank),
        ],
        Level::Upper => vec![
            result,
            total,
            percentage,
            Cell::optional_integer(record.rank),
            record
                .stream
                .map(|s| Cell::text(s.name()))
                .unwrap_or(Cell::Blank),
            main_total,
            main_percentage,
            main_rank,
        ],
    }
}

/// Student table: identity, grade columns, marks columns, then results and ranks.
pub fn build_record_table(level: Level, batch: &RankedBatch) -> Table {
    let mut headers: Vec<String> = vec!["Roll No".into(), "Gender".into(), "Name".into()];
    headers.extend(batch.subjects.iter().map(|label| grade_header(label)));
    headers.extend(batch.subjects.iter().cloned());
    headers.extend(result_headers(level).into_iter().map(String::from));

    let rows = batch
        .records
        .iter()
        .map(|record| {
            let student = &record.record;
            let mut row = vec![
                Cell::text(&student.roll_no),
                Cell::text(&student.gender),
                Cell::text(&student.name),
            ];
            row.extend(batch.subjects.iter().map(|label| {
                student.grade_for(label).map(Cell::text).unwrap_or(Cell::Blank)
            }));
            row.extend(
                batch
                    .subjects
                    .iter()
                    .map(|label| Cell::optional_integer(student.marks_for(label))),
            );
            row.extend(result_cells(level, record));
            row
        })
        .collect();

    Table { headers, rows }
}

/// Statistics table: one row per statistic, one column per subject.
pub fn build_summary_table(subjects: &[String], summary: &[SummaryRow]) -> Table {
    if summary.is_empty() {
        return Table::default();
    }

    let mut headers = vec!["Statistic".to_string()];
    headers.extend(subjects.iter().cloned());

    let rows = summary
        .iter()
        .map(|row| {
            let mut cells = vec![Cell::text(&row.statistic)];
            cells.extend(subjects.iter().map(|label| match row.value_for(label) {
                Some(StatValue::Count(count)) => Cell::Integer(count.into()),
                Some(StatValue::Value(value)) => Cell::Number(value),
                None => Cell::Blank,
            }));
            cells
        })
        .collect();

    Table { headers, rows }
}

/// Destination for finished tables.
pub trait TableSink {
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()>;
}

/// Writes each table as `<stem>.csv` or `<stem>_<name>.csv`.
pub struct CsvSink {
    output_dir: PathBuf,
    stem: String,
    written: Vec<PathBuf>,
}

impl CsvSink {
    pub fn new(output_dir: &Path, stem: &str) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            stem: stem.to_string(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn path_for(&self, name: &str) -> PathBuf {
        if name.is_empty() || name == "records" {
            self.output_dir.join(format!("{}.csv", self.stem))
        } else {
            self.output_dir.join(format!("{}_{}.csv", self.stem, name))
        }
    }
}

impl TableSink for CsvSink {
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        let path = self.path_for(name);
        let mut writer = Writer::from_path(&path)?;

        if !table.headers.is_empty() {
            writer.write_record(&table.headers)?;
        }
        for row in &table.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }

        writer.flush()?;
        self.written.push(path);
        Ok(())
    }
}

/// Writes the record table and the summary table through a sink.
pub fn write_tables(sink: &mut dyn TableSink, level: Level, batch: &RankedBatch) -> Result<()> {
    sink.write_table("records", &build_record_table(level, batch))?;
    sink.write_table("summary", &build_summary_table(&batch.subjects, &batch.summary))?;
    Ok(())
}
