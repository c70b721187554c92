// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid quarter: {0} (expected 1-4)")]
    InvalidQuarter(u32),

    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
