use thiserror::Error;

/// Enumeration of reasons a raw payload could not be turned into an `Event`.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("received empty payload")]
    Empty,
    #[error("payload is not valid json: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("payload is missing required fields or has the wrong shape: {0}")]
    Shape(#[source] serde_json::Error),
}

impl DecodeError {
    /// Short label used to tag decode error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Empty => "empty",
            DecodeError::Malformed(_) => "malformed",
            DecodeError::Shape(_) => "shape",
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Data => DecodeError::Shape(err),
            Category::Io | Category::Syntax | Category::Eof => DecodeError::Malformed(err),
        }
    }
}

/// A decoded event carried hashtags but lacked a field needed to build its people list.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("event has no author screen name")]
    MissingAuthor,
    #[error("event has no usable user mentions")]
    MissingMentions,
}

#[derive(Error, Debug)]
pub enum SourceError {
    /// The source will not produce any more payloads.
    #[error("event source is closed")]
    Closed,
    #[error("event source transport error: {0}")]
    Transport(String),
}

/// Errors that stop a pipeline run before or while it is starting.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("at least one ingestion worker is required")]
    NoWorkers,
    #[error("the report interval must be greater than zero")]
    ZeroReportInterval,
    #[error("failed to emit report: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}
