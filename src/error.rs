use crate::model::CityId;
use thiserror::Error;

/// Failures at the data-access boundary
#[derive(Debug, Error)]
pub enum DataError {
    /// The city list or a route could not be obtained
    #[error("{0}")]
    Unavailable(String),

    #[error("city {id} ({name}) has an invalid coordinate")]
    InvalidCoordinate { id: CityId, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data: {0}")]
    Parse(#[from] simd_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl DataError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        DataError::Unavailable(msg.into())
    }
}

/// Misuse of the route planning state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("select both a starting point and a destination first")]
    IncompleteSelection,
}
