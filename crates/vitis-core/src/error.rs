use thiserror::Error;

/// Failure taxonomy shared by the retrieval and generation layers.
///
/// Only `InvalidConfig` and `Io` are expected to reach a process boundary;
/// the rest are converted to user-facing replies by `vitis-rag`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Corpus directory or lexical index missing at startup.
    #[error("Configuration unavailable: {0}")]
    ConfigurationUnavailable(String),

    /// A retriever failed during a live query.
    #[error("Retrieval failed: {0}")]
    RetrievalFailure(String),

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    /// Missing session, room or message identifiers.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
