// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Macrodesk support agent.

use thiserror::Error;

/// The primary error type used across all Macrodesk adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MacrodeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel errors (webhook ingestion, voice session, message delivery).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render_messages() {
        let config = MacrodeskError::Config("bad key".into());
        assert!(config.to_string().contains("bad key"));

        let storage = MacrodeskError::Storage {
            source: Box::new(std::io::Error::other("disk gone")),
        };
        assert!(storage.to_string().contains("disk gone"));

        let provider = MacrodeskError::Provider {
            message: "model not found".into(),
            source: None,
        };
        assert!(provider.to_string().contains("model not found"));

        let timeout = MacrodeskError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        assert!(timeout.to_string().contains("30"));
    }
}
