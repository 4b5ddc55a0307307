use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutletError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Missing column(s) in {file}: {}", columns.join(", "))]
    MissingSourceColumn { file: String, columns: Vec<String> },

    #[error("No data for the selected filters")]
    NoDataForFilter,

    #[error("Source not found: {0}")]
    SourceUnavailable(String),

    #[error("Unknown month: {0}")]
    UnknownMonth(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, OutletError>;
