use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or driving a hosted plugin.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to load plugin library {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },
    #[error("factory has no plugin with id {0:?}")]
    DescriptorNotFound(String),
    #[error("plugin protocol version {major}.{minor}.{revision} does not match this host")]
    VersionMismatch { major: u32, minor: u32, revision: u32 },
    #[error("plugin refused to init")]
    InitFailed,
    #[error("plugin refused to activate")]
    ActivationFailed,
    /// Activating a plugin that is already active signals a host bug, not a
    /// recoverable plugin condition.
    #[error("activation precondition violated: plugin is already active")]
    ActivationPrecondition,
    #[error("failed to re-encode plugin MIDI output: {0}")]
    EncodeFailed(String),
    #[error("state transfer rejected by plugin")]
    StateRejected,
    #[error("state I/O failed: {0}")]
    StateIoFailed(#[from] std::io::Error),
}
