// exception.rs -- herdstat errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HerdstatError {
    /// The document is not well-formed XML.
    #[error("Error parsing xml: {0}")]
    Parse(String),
    /// herds.xml could not be read from its location.
    #[error("Failed to open '{location}': {reason}")]
    Retrieval { location: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HerdstatError {
    pub fn parse(msg: impl Into<String>) -> Self {
        HerdstatError::Parse(msg.into())
    }

    pub fn retrieval(location: &str, reason: impl ToString) -> Self {
        HerdstatError::Retrieval {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}
