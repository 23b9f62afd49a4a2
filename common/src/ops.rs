//! Backup, restore, test-restore and list operations
//!
//! Each operation validates the configuration, builds its commands, then
//! wires the stages into a single directional pipeline. Dry-run mode stops
//! after logging the assembled commands: nothing is spawned and the
//! filesystem is not touched.

use std::process::Stdio;

use crate::cleanup::CleanupGuard;
use crate::cmd;
use crate::config::{Config, Operation};
use crate::errors::{ConfigError, Error, Result};
use crate::pipeline::{self, Sink, Source, StageSpec};
use crate::tree;

/// Transport argv running `remote_command` on the configured host.
fn transport_argv(config: &Config, remote_command: &str) -> Vec<String> {
    let mut argv = vec![config.tools.ssh.clone()];
    argv.extend(cmd::ssh_args(config, remote_command));
    argv
}

/// Confirm a required local binary is reachable before spawning pipelines.
async fn ensure_binary(binary: &str) -> Result<()> {
    let missing = || Error::Environment {
        binary: binary.to_string(),
    };
    if binary.contains('/') {
        if std::path::Path::new(binary).is_file() {
            return Ok(());
        }
        return Err(missing());
    }
    let status = tokio::process::Command::new("which")
        .arg(binary)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(missing())
    }
}

async fn ensure_environment(config: &Config, binaries: &[&str]) -> Result<()> {
    for binary in binaries {
        ensure_binary(binary).await?;
    }
    if config.progress {
        ensure_binary(&config.tools.pv).await?;
    }
    Ok(())
}

/// Lightweight remote check that the archiver binary is reachable.
async fn probe_remote_archiver(config: &Config) -> Result<()> {
    let probe = cmd::probe_command(config);
    let argv = transport_argv(config, &probe);
    tracing::debug!("probing remote archiver: {}", argv.join(" "));
    let status = tokio::process::Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Capability {
            host: config.host.clone().unwrap_or_default(),
            detail: format!(
                "'{}' not reachable over the transport (status {})",
                config.tools.tar,
                status.code().unwrap_or(-1)
            ),
        })
    }
}

/// Verify a written artifact with the compressor's integrity-test mode.
async fn verify_artifact(config: &Config, archive: &std::path::Path) -> Result<()> {
    let argv = cmd::integrity_argv(config, archive);
    tracing::debug!("verifying artifact: {}", argv.join(" "));
    let status = tokio::process::Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Integrity {
            archive: archive.to_path_buf(),
            detail: format!(
                "compressor integrity test failed (status {})",
                status.code().unwrap_or(-1)
            ),
        })
    }
}

/// Resolve the artifact path exactly once, before pipeline start.
fn resolve_artifact_path(config: &Config) -> std::path::PathBuf {
    if let Some(archive) = &config.archive {
        return archive.clone();
    }
    let host = config.host.as_deref().unwrap_or("backup");
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    std::path::PathBuf::from(format!("{host}-{stamp}.tar.zst"))
}

fn log_dry_run(operation: Operation, stages: &[StageSpec]) {
    tracing::info!("dry-run {operation}: no process started, filesystem untouched");
    for stage in stages {
        tracing::info!("dry-run {operation} [{}]: {}", stage.name, stage.display());
    }
}

/// Archive the configured sources from the remote host into the artifact.
pub async fn backup(config: &Config) -> Result<()> {
    config.validate(Operation::Backup)?;
    let archive = resolve_artifact_path(config);
    let mut stages = vec![StageSpec::new(
        "transport",
        transport_argv(config, &cmd::archive_create_command(config)),
    )];
    if config.progress {
        stages.push(StageSpec::new("progress", cmd::progress_argv(config, None)));
    }
    stages.push(StageSpec::new("compress", cmd::compress_argv(config)));
    if config.dry_run {
        log_dry_run(Operation::Backup, &stages);
        tracing::info!("dry-run backup [sink]: {}", archive.display());
        return Ok(());
    }
    ensure_environment(config, &[&config.tools.ssh, &config.tools.zstd]).await?;
    probe_remote_archiver(config).await?;
    let mut guard = CleanupGuard::new();
    if !archive.exists() {
        guard.own(&archive);
    }
    pipeline::run(&stages, Source::Null, Sink::File(archive.clone())).await?;
    verify_artifact(config, &archive).await?;
    guard.disarm();
    let size = tokio::fs::metadata(&archive).await.map(|m| m.len()).unwrap_or(0);
    tracing::info!(
        "backup complete: {} ({})",
        archive.display(),
        bytesize::ByteSize(size)
    );
    Ok(())
}

/// Stream the artifact back to the remote host and extract it there.
pub async fn restore(config: &Config) -> Result<()> {
    config.validate(Operation::Restore)?;
    let archive = config.archive.clone().ok_or(ConfigError::MissingArchive)?;
    let target = config.remote_prefix.clone().unwrap_or_else(|| "/".to_string());
    let mkdir_stage = StageSpec::new(
        "mkdir",
        transport_argv(config, &cmd::mkdir_command(config, &target)),
    );
    if config.dry_run {
        let stages = restore_stages(config, None, &target);
        log_dry_run(Operation::Restore, &[vec![mkdir_stage], stages].concat());
        return Ok(());
    }
    ensure_environment(config, &[&config.tools.ssh, &config.tools.zstd]).await?;
    pipeline::run(&[mkdir_stage], Source::Null, Sink::Null).await?;
    // a probe failure past this point leaves the just-created (empty)
    // remote directory in place; cleanup scope is the local artifact only
    probe_remote_archiver(config).await?;
    let size = tokio::fs::metadata(&archive).await?.len();
    let stages = restore_stages(config, Some(size), &target);
    pipeline::run(&stages, Source::File(archive.clone()), Sink::Null).await?;
    tracing::info!(
        "restore complete: {} into {}:{}",
        archive.display(),
        config.host.as_deref().unwrap_or_default(),
        target
    );
    Ok(())
}

fn restore_stages(config: &Config, size: Option<u64>, target: &str) -> Vec<StageSpec> {
    let mut stages = Vec::new();
    if config.progress {
        stages.push(StageSpec::new("progress", cmd::progress_argv(config, size)));
    }
    stages.push(StageSpec::new("decompress", cmd::decompress_argv(config)));
    stages.push(StageSpec::new(
        "transport",
        transport_argv(config, &cmd::archive_extract_command(config, target)),
    ));
    stages
}

/// Extract the artifact into a local directory instead of the remote host.
pub async fn test_restore(config: &Config) -> Result<()> {
    config.validate(Operation::TestRestore)?;
    let archive = config.archive.clone().ok_or(ConfigError::MissingArchive)?;
    let output_dir = config
        .output_dir
        .clone()
        .ok_or(ConfigError::MissingOutputDir)?;
    let build_stages = |size: Option<u64>| {
        let mut stages = Vec::new();
        if config.progress {
            stages.push(StageSpec::new("progress", cmd::progress_argv(config, size)));
        }
        stages.push(StageSpec::new("decompress", cmd::decompress_argv(config)));
        stages.push(StageSpec::new(
            "extract",
            cmd::archive_extract_argv(config, &output_dir.display().to_string(), false),
        ));
        stages
    };
    if config.dry_run {
        log_dry_run(Operation::TestRestore, &build_stages(None));
        return Ok(());
    }
    ensure_environment(config, &[&config.tools.tar, &config.tools.zstd]).await?;
    tokio::fs::create_dir_all(&output_dir).await?;
    let size = tokio::fs::metadata(&archive).await?.len();
    pipeline::run(&build_stages(Some(size)), Source::File(archive.clone()), Sink::Null).await?;
    tracing::info!(
        "test restore complete: {} into {}",
        archive.display(),
        output_dir.display()
    );
    Ok(())
}

/// List the artifact's members and render them as an indented tree.
pub async fn list(config: &Config) -> Result<String> {
    config.validate(Operation::List)?;
    let archive = config.archive.clone().ok_or(ConfigError::MissingArchive)?;
    let stages = [
        StageSpec::new("decompress", cmd::decompress_argv(config)),
        StageSpec::new("list", cmd::archive_list_argv(config)),
    ];
    if config.dry_run {
        log_dry_run(Operation::List, &stages);
        return Ok(String::new());
    }
    ensure_environment(config, &[&config.tools.tar, &config.tools.zstd]).await?;
    let output = pipeline::run(&stages, Source::File(archive), Sink::Capture).await?;
    // the archiver prints members in archive order; the renderer requires
    // them sorted segment by segment. Plain byte order would slot a name
    // like "a-b" between "a/" and its children and detach them.
    let mut members: Vec<String> = String::from_utf8_lossy(&output)
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    members.sort_by(|a, b| a.split('/').cmp(b.split('/')));
    Ok(tree::render(&members))
}
