//! Error taxonomy for backup/restore orchestration
//!
//! Errors are grouped by the phase in which they can occur: configuration
//! and environment errors happen before any process is spawned, capability
//! errors abort before any byte is streamed, pipeline and integrity errors
//! are detected after stages have run and trigger artifact cleanup.

/// A configuration constraint violated before any process starts.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("compression level must be between 1 and 22, got {0}")]
    CompressionLevel(u32),

    #[error("backup requires a remote host (--host)")]
    BackupMissingHost,

    #[error("backup requires at least one source path")]
    BackupMissingSources,

    #[error("restore requires a remote host (--host)")]
    RestoreMissingHost,

    #[error("this operation requires an archive path (--archive)")]
    MissingArchive,

    #[error("archive does not exist: {0}")]
    ArchiveNotFound(std::path::PathBuf),

    #[error("test-restore requires a local output directory (--output-dir)")]
    MissingOutputDir,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required external binary is absent on the local host.
    #[error("required binary not found: {binary}")]
    Environment { binary: String },

    /// The remote archiver probe failed.
    #[error("remote capability check failed on {host}: {detail}")]
    Capability { host: String, detail: String },

    /// A stage in a running pipeline exited non-zero.
    #[error("pipeline stage '{stage}' failed with status {status}")]
    Pipeline { stage: String, status: i32 },

    /// Post-write artifact verification failed.
    #[error("integrity check failed for {archive}: {detail}")]
    Integrity {
        archive: std::path::PathBuf,
        detail: String,
    },

    #[error("interrupted")]
    Interrupted,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
