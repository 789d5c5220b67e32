use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApuraError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File could not be parsed under any delimiter/encoding combination,
    /// or a required header fragment was never found. Reported per file.
    #[error("Unreadable file: {0}")]
    Read(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ApuraError>;
