//! Error types for the coordination core.
//!
//! Uses thiserror for ergonomic error definition. Consistency findings are
//! not errors; they are ordinary return values (see [`crate::finding`]).

/// Main error type for the coordination core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Blackboard-related error
    #[error("Blackboard error: {0}")]
    Blackboard(#[from] BlackboardError),

    /// Story index error
    #[error("Story index error: {0}")]
    Index(#[from] IndexError),

    /// Character tracker error
    #[error("Character tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Checkpoint persistence error
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Blackboard-specific errors
#[derive(Debug, thiserror::Error)]
pub enum BlackboardError {
    /// No entry under the requested key
    #[error("Key not found: {key}")]
    NotFound { key: String },

    /// A key pattern could not be compiled
    #[error("Invalid key pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Snapshot rejected on import; the store was left untouched
    #[error("Malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    /// Agent is not allowed to perform the operation
    #[error("Agent '{agent}' is not authorized to {operation}")]
    Unauthorized { agent: String, operation: String },
}

/// Story index errors
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Episode text contained no indexable content
    #[error("Episode {episode} has no content to index")]
    EmptyContent { episode: u32 },

    /// Episode number already indexed
    #[error("Episode {episode} is already indexed")]
    DuplicateEpisode { episode: u32 },

    /// Episode number not indexed
    #[error("Episode {episode} is not indexed")]
    EpisodeNotFound { episode: u32 },

    /// Item was never registered
    #[error("Item not found: {name}")]
    ItemNotFound { name: String },

    /// Snapshot rejected on import
    #[error("Malformed story index snapshot: {reason}")]
    MalformedSnapshot { reason: String },
}

/// Character tracker errors
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Character was never registered
    #[error("Character not found: {name}")]
    NotFound { name: String },

    /// Character has no appearance at or before the requested episode
    #[error("{name} has not appeared by episode {episode}")]
    NotYetAppeared { name: String, episode: u32 },

    /// Snapshot rejected on import
    #[error("Malformed character snapshot: {reason}")]
    MalformedSnapshot { reason: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error while reading a config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config did not parse
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config parsed but is unusable
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// Checkpoint persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Reading or writing the checkpoint file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The checkpoint did not serialize or parse
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The checkpoint was written with another format version
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for blackboard operations
pub type BlackboardResult<T> = std::result::Result<T, BlackboardError>;

/// Result type for story index operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Result type for character tracker operations
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
