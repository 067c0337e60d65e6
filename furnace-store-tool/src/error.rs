use thiserror::Error;

use crate::field::Field;

/// Errors that can occur while reading settings CSV files or generating and parsing flash
/// images.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("store error: {0}")]
    StoreError(#[from] furnace_store::error::Error),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field {0} appears more than once")]
    DuplicateField(Field),

    #[error("field {0} belongs to a subsystem missing from the capability set")]
    FieldNotInBuild(Field),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: Field, value: String },

    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("invalid image size {0}: must be two sectors of a multiple of 4096 bytes")]
    InvalidImageSize(usize),
}
