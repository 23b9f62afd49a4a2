//! Configuration record for a single backup/restore invocation
//!
//! The record is built once by the CLI, validated before any process is
//! spawned, and passed by reference into every component. No component
//! reads process-wide mutable state.

use crate::errors::ConfigError;

/// The operation a single invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Backup,
    List,
    TestRestore,
    Restore,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Backup => "backup",
            Operation::List => "list",
            Operation::TestRestore => "test-restore",
            Operation::Restore => "restore",
        };
        write!(f, "{name}")
    }
}

/// Paths to the external tools composing the pipelines.
///
/// Each is independently overridable through the environment
/// (`RBAK_SSH`, `RBAK_PV`, `RBAK_TAR`, `RBAK_ZSTD`).
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ssh: String,
    pub pv: String,
    pub tar: String,
    pub zstd: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ssh: "ssh".to_string(),
            pv: "pv".to_string(),
            tar: "tar".to_string(),
            zstd: "zstd".to_string(),
        }
    }
}

impl ToolPaths {
    /// Resolve tool paths from the environment, falling back to bare names.
    pub fn from_env() -> Self {
        let get = |key: &str, default: &str| {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        Self {
            ssh: get("RBAK_SSH", "ssh"),
            pv: get("RBAK_PV", "pv"),
            tar: get("RBAK_TAR", "tar"),
            zstd: get("RBAK_ZSTD", "zstd"),
        }
    }
}

/// Immutable configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    // transport
    pub host: Option<String>,
    pub port: Option<u16>,
    pub identity: Option<std::path::PathBuf>,
    /// ServerAliveInterval passed to the transport
    pub keepalive_interval_sec: u64,
    /// ServerAliveCountMax passed to the transport
    pub keepalive_count_max: u32,

    // privilege elevation (full command strings, e.g. "sudo" or "doas -u root")
    pub remote_sudo: Option<String>,
    pub local_sudo: Option<String>,

    // compression
    pub level: u32,
    /// 0 means all cores
    pub threads: u32,

    // metadata preservation (opt-out)
    pub acls: bool,
    pub xattrs: bool,

    // paths
    pub archive: Option<std::path::PathBuf>,
    pub remote_prefix: Option<String>,
    pub output_dir: Option<std::path::PathBuf>,
    pub excludes: Vec<String>,
    pub sources: Vec<String>,

    // execution modes
    pub dry_run: bool,
    pub verbose: u8,
    pub progress: bool,

    pub tools: ToolPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            identity: None,
            keepalive_interval_sec: 15,
            keepalive_count_max: 3,
            remote_sudo: None,
            local_sudo: None,
            level: 19,
            threads: 0,
            acls: true,
            xattrs: true,
            archive: None,
            remote_prefix: None,
            output_dir: None,
            excludes: vec![],
            sources: vec![],
            dry_run: false,
            verbose: 0,
            progress: false,
            tools: ToolPaths::default(),
        }
    }
}

impl Config {
    /// Check the record for completeness and range validity.
    ///
    /// Returns the first violated constraint. Must be called (and pass)
    /// before any process is spawned.
    pub fn validate(&self, operation: Operation) -> Result<(), ConfigError> {
        if !(1..=22).contains(&self.level) {
            return Err(ConfigError::CompressionLevel(self.level));
        }
        match operation {
            Operation::Backup => {
                if self.host.is_none() {
                    return Err(ConfigError::BackupMissingHost);
                }
                if self.sources.is_empty() {
                    return Err(ConfigError::BackupMissingSources);
                }
            }
            Operation::List | Operation::TestRestore | Operation::Restore => {
                let archive = self.archive.as_ref().ok_or(ConfigError::MissingArchive)?;
                if !archive.is_file() {
                    return Err(ConfigError::ArchiveNotFound(archive.clone()));
                }
                if operation == Operation::Restore && self.host.is_none() {
                    return Err(ConfigError::RestoreMissingHost);
                }
                if operation == Operation::TestRestore && self.output_dir.is_none() {
                    return Err(ConfigError::MissingOutputDir);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backup_config() -> Config {
        Config {
            host: Some("backup-host".to_string()),
            sources: vec!["/etc".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn valid_backup_config_passes() {
        assert!(backup_config().validate(Operation::Backup).is_ok());
    }

    #[test]
    fn compression_level_out_of_range() {
        for level in [0, 23, 100] {
            let config = Config {
                level,
                ..backup_config()
            };
            assert_eq!(
                config.validate(Operation::Backup),
                Err(ConfigError::CompressionLevel(level))
            );
        }
    }

    #[test]
    fn backup_requires_host() {
        let config = Config {
            host: None,
            ..backup_config()
        };
        assert_eq!(
            config.validate(Operation::Backup),
            Err(ConfigError::BackupMissingHost)
        );
    }

    #[test]
    fn backup_requires_sources() {
        let config = Config {
            sources: vec![],
            ..backup_config()
        };
        assert_eq!(
            config.validate(Operation::Backup),
            Err(ConfigError::BackupMissingSources)
        );
    }

    #[test]
    fn list_requires_existing_archive() {
        let config = Config::default();
        assert_eq!(
            config.validate(Operation::List),
            Err(ConfigError::MissingArchive)
        );
        let config = Config {
            archive: Some("/nonexistent/backup.tar.zst".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(Operation::List),
            Err(ConfigError::ArchiveNotFound(_))
        ));
    }

    #[test]
    fn restore_requires_host() {
        let archive = tempfile::NamedTempFile::new().unwrap();
        let config = Config {
            archive: Some(archive.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(
            config.validate(Operation::Restore),
            Err(ConfigError::RestoreMissingHost)
        );
    }

    #[test]
    fn test_restore_requires_output_dir() {
        let archive = tempfile::NamedTempFile::new().unwrap();
        let config = Config {
            archive: Some(archive.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(
            config.validate(Operation::TestRestore),
            Err(ConfigError::MissingOutputDir)
        );
    }

    #[test]
    fn tool_paths_default_to_bare_names() {
        let tools = ToolPaths::default();
        assert_eq!(tools.ssh, "ssh");
        assert_eq!(tools.zstd, "zstd");
    }
}
