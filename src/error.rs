use thiserror::Error;

#[derive(Error, Debug)]
pub enum YtdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook read error: {0}")]
    Read(#[from] calamine::Error),

    #[error("Workbook read error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("Workbook write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[cfg(feature = "fills")]
    #[error("Workbook package error: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Project list not found for {0}")]
    SourceUnavailable(String),

    #[error("No project lists could be loaded")]
    NoSources,

    #[error("Invalid quarter: {0} (expected 1-4)")]
    InvalidQuarter(u32),

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Could not save workbook: {0}")]
    Persistence(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, YtdError>;
