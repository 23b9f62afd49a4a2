//! Command construction for the archiver, compressor and transport
//!
//! Everything here is a pure function of the configuration: building a
//! command has no side effects and spawns nothing. Commands destined to
//! cross the transport boundary are escaped token by token so the remote
//! shell reproduces the original argument vector verbatim.

use crate::config::Config;
use crate::escape::{join_escaped, shell_escape};

/// Split a privilege-elevation command string into argv tokens.
///
/// Returns an empty prefix when no elevation is configured.
fn sudo_prefix(command: &Option<String>) -> Vec<String> {
    command
        .as_deref()
        .map(|cmd| cmd.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Archiver argv for creating an archive of the configured sources.
///
/// The archiver runs against the filesystem root; source paths are made
/// relative to it so member names in the archive carry no leading slash.
pub fn archive_create_argv(config: &Config) -> Vec<String> {
    let mut argv = sudo_prefix(&config.remote_sudo);
    argv.push(config.tools.tar.clone());
    argv.extend(["-c", "-p", "-f", "-"].map(String::from));
    if config.acls {
        argv.push("--acls".to_string());
    }
    if config.xattrs {
        argv.push("--xattrs".to_string());
    }
    for pattern in &config.excludes {
        argv.push(format!("--exclude={pattern}"));
    }
    argv.extend(["-C", "/", "--"].map(String::from));
    for source in &config.sources {
        let relative = source.trim_start_matches('/');
        if relative.is_empty() {
            argv.push(".".to_string());
        } else {
            argv.push(relative.to_string());
        }
    }
    argv
}

/// The remote archive-creation command as a single escaped string.
pub fn archive_create_command(config: &Config) -> String {
    join_escaped(archive_create_argv(config))
}

/// Archiver argv for extracting an archive stream into `target_dir`.
///
/// `remote` selects which privilege-elevation prefix applies. Numeric
/// ownership is always preserved on extraction.
pub fn archive_extract_argv(config: &Config, target_dir: &str, remote: bool) -> Vec<String> {
    let elevation = if remote {
        &config.remote_sudo
    } else {
        &config.local_sudo
    };
    let mut argv = sudo_prefix(elevation);
    argv.push(config.tools.tar.clone());
    argv.extend(["-x", "-p", "--numeric-owner", "-f", "-"].map(String::from));
    if config.acls {
        argv.push("--acls".to_string());
    }
    if config.xattrs {
        argv.push("--xattrs".to_string());
    }
    argv.push("-C".to_string());
    argv.push(target_dir.to_string());
    argv
}

/// The remote extraction command as a single escaped string.
pub fn archive_extract_command(config: &Config, target_dir: &str) -> String {
    join_escaped(archive_extract_argv(config, target_dir, true))
}

/// Archiver argv for listing the members of an archive stream.
pub fn archive_list_argv(config: &Config) -> Vec<String> {
    vec![
        config.tools.tar.clone(),
        "-t".to_string(),
        "-f".to_string(),
        "-".to_string(),
    ]
}

/// Remote command creating the restore target directory.
pub fn mkdir_command(config: &Config, dir: &str) -> String {
    let mut argv = sudo_prefix(&config.remote_sudo);
    argv.push("mkdir".to_string());
    argv.push("-p".to_string());
    argv.push(dir.to_string());
    join_escaped(argv)
}

/// Remote command probing that the archiver binary is reachable.
pub fn probe_command(config: &Config) -> String {
    format!("command -v {}", shell_escape(&config.tools.tar))
}

/// Transport argv (without the transport binary itself) running
/// `remote_command` on the configured host.
pub fn ssh_args(config: &Config, remote_command: &str) -> Vec<String> {
    let host = config.host.clone().unwrap_or_default();
    let mut args = Vec::new();
    if let Some(port) = config.port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    if let Some(identity) = &config.identity {
        args.push("-i".to_string());
        args.push(identity.display().to_string());
    }
    args.push("-o".to_string());
    args.push("BatchMode=yes".to_string());
    args.push("-o".to_string());
    args.push(format!("ServerAliveInterval={}", config.keepalive_interval_sec));
    args.push("-o".to_string());
    args.push(format!("ServerAliveCountMax={}", config.keepalive_count_max));
    args.push("--".to_string());
    args.push(host);
    args.push(remote_command.to_string());
    args
}

/// Compressor argv for the backup pipeline (stdin to stdout).
pub fn compress_argv(config: &Config) -> Vec<String> {
    let mut argv = vec![config.tools.zstd.clone(), "-q".to_string()];
    argv.push(format!("-{}", config.level));
    // levels above 19 need the extended range unlocked
    if config.level > 19 {
        argv.push("--ultra".to_string());
    }
    argv.push(format!("-T{}", config.threads));
    argv
}

/// Decompressor argv (stdin to stdout).
pub fn decompress_argv(config: &Config) -> Vec<String> {
    vec![
        config.tools.zstd.clone(),
        "-d".to_string(),
        "-q".to_string(),
    ]
}

/// Compressor argv for verifying a written artifact.
pub fn integrity_argv(config: &Config, archive: &std::path::Path) -> Vec<String> {
    vec![
        config.tools.zstd.clone(),
        "-t".to_string(),
        "-q".to_string(),
        archive.display().to_string(),
    ]
}

/// Progress meter argv; `size` enables a sized display for file sources.
pub fn progress_argv(config: &Config, size: Option<u64>) -> Vec<String> {
    let mut argv = vec![config.tools.pv.clone()];
    if let Some(size) = size {
        argv.push("-s".to_string());
        argv.push(size.to_string());
    }
    argv
}
