use thiserror::Error;

/// Result alias shared by the common and engine crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration handling, the simulation core and snapshot I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value (or an explicitly supplied initial state) is out of range.
    /// Raised before any step runs.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An internal invariant was violated during a step, e.g. an empty neighbor set.
    #[error("invalid simulation state: {0}")]
    InvalidState(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Encoding or decoding a snapshot file failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_category() {
        let e = Error::InvalidConfig("interaction_radius must be positive".to_string());
        let msg = e.to_string();
        assert!(msg.contains("invalid configuration"));
        assert!(msg.contains("interaction_radius"));

        let e = Error::InvalidState("empty neighbor set for particle 3".to_string());
        assert!(e.to_string().starts_with("invalid simulation state"));
    }
}
