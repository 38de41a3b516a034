//! Error types.
//!
//! None of these ever cross the native boundary: inside callbacks they are logged and turned
//! into the protocol's `false` / zero answer.

use std::path::PathBuf;

use thiserror::Error;

/// Structural ABI problems. Fatal at initialization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("layout mismatch for {item}: expected {expected}, found {actual}")]
    LayoutMismatch {
        item: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("core reports API version {found}, host implements {expected}")]
    ApiVersion { expected: u32, found: u32 },
}

/// Errors while opening a core library.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open core library {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("core library {path} is missing entry point `{symbol}`")]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
    },
    #[error("core library {0} is already loaded")]
    AlreadyLoaded(PathBuf),
    #[error(transparent)]
    Abi(#[from] AbiError),
}

/// Errors from the save-state bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("core does not support save states")]
    Unsupported,
    #[error("core refused to serialize {size} bytes")]
    SerializeFailed { size: usize },
    #[error("core refused to restore a {size} byte state")]
    UnserializeFailed { size: usize },
    #[error("state is {actual} bytes but the core expects {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("state was produced in another session and the core declared single-session states")]
    ForeignSession,
    #[error("state was produced on a {found} host, this host is {expected}")]
    PlatformMismatch {
        expected: &'static str,
        found: String,
    },
    #[error("core must run a frame before its state can be serialized")]
    NotInitialized,
}

/// Errors reading or writing host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("invalid core option file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the host session.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("core rejected the content")]
    ContentRejected,
    #[error("core requires a content path but none was given")]
    ContentRequired,
    #[error("core cannot run without content")]
    NoGameUnsupported,
    #[error("no game is loaded")]
    NoGame,
    #[error("a game is already loaded")]
    GameAlreadyLoaded,
    #[error("failed to read content {path}: {source}")]
    ContentIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path contains an interior NUL byte: {0}")]
    InvalidPath(PathBuf),
    #[error("core did not register {0}")]
    MissingInterface(&'static str),
}

/// Errors from the screenshot and WAV capture sinks.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame is {actual} bytes, {width}x{height} RGBA needs {expected}")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}
