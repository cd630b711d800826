//! The uniform error type returned at the registry's public boundary.
//!
//! Internal validation and parsing failures are collected into one of these
//! variants before they cross out of [`crate::registry::ProtocolRegistry`];
//! no error path is expected to unwind past that boundary as unstructured
//! text (see spec §7).

use thiserror::Error;

/// A single structured catalogue validation problem, tagged with the file
/// it came from so several can be reported together.
#[derive(Debug, Clone, Error)]
#[error("{file}: {message}")]
pub struct CatalogueIssue {
    pub file: String,
    pub message: String,
}

impl CatalogueIssue {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while using the protocol registry.
#[derive(Debug, Error)]
pub enum RemoteProtoError {
    /// Malformed catalogue schema, unknown references, out-of-range defaults,
    /// non-alternating timing signs, duplicate argument names, etc.
    #[error("invalid protocol catalogue ({} issue(s))", .0.len())]
    Catalogue(Vec<CatalogueIssue>),

    /// An underlying YAML document could not even be parsed.
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Unknown identifier, unclosed conditional, missing consequent, or
    /// leftover text the pattern tokenizer could not consume.
    #[error("invalid pattern at `{remainder}`: {message}")]
    PatternParse { remainder: String, message: String },

    /// Unknown protocol name, too many arguments, a non-integer argument,
    /// or an argument outside its range/enumerated values.
    #[error("invalid command `{command}`: {message} (expected `{signature}`)")]
    CommandParse {
        command: String,
        message: String,
        signature: String,
    },

    /// Protocol name was not found in the registry.
    #[error("unknown protocol '{0}'")]
    UnknownProtocol(String),

    /// Defensive argument-range violation surfaced at encode time.
    #[error("argument #{index} <{name}>: {message}")]
    EncodeArg {
        index: usize,
        name: String,
        message: String,
    },

    /// Malformed base64/hex, inconsistent declared length, or too many
    /// distinct durations (miio's 16-entry dictionary cap).
    #[error("raw codec '{format}' error: {message}")]
    RawCodec { format: &'static str, message: String },

    /// A generic I/O failure (catalogue file could not be read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RemoteProtoError>;
