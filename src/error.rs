//! Error types for result sheet processing

use crate::models::Level;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResultSheetError {
    /// File or sample carries subject codes of the other level
    #[error("Please use the correct file and sample for {level}.\n{details}", level = .0.level, details = .0)]
    ConfigurationMismatch(Mismatch),

    #[error("A sample student line is required to infer or validate the level")]
    MissingSample,

    #[error("No valid student record found in the file")]
    NoCandidateLine,

    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Writing output failed: {0}")]
    Output(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ResultSheetError>;

/// Which codes were wrong, and where they were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub level: Level,
    pub wrong_in_file: Vec<String>,
    pub wrong_in_sample: Vec<String>,
    pub no_valid_in_file: bool,
    pub no_valid_in_sample: bool,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.wrong_in_file.is_empty() {
            writeln!(
                f,
                "Wrong subject codes in first student record: {}",
                self.wrong_in_file.join(", ")
            )?;
        }
        if !self.wrong_in_sample.is_empty() {
            writeln!(
                f,
                "Wrong subject codes in sample text: {}",
                self.wrong_in_sample.join(", ")
            )?;
        }
        if self.no_valid_in_file {
            writeln!(f, "No valid subject codes found in first student record.")?;
        }
        if self.no_valid_in_sample {
            writeln!(f, "No valid subject codes found in sample text.")?;
        }
        Ok(())
    }
}
