use clap::{Parser, Subcommand};

use common::config::{Config, Operation, ToolPaths};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rbak",
    version,
    about = "Back up and restore remote filesystem trees over ssh through a tar | zstd pipeline",
    long_about = "`rbak` composes a remote-shell transport, a stream archiver and a stream \
compressor into directional pipelines for backing up and restoring remote filesystem trees.

The transport, progress meter, archiver and compressor binaries are overridable through the \
RBAK_SSH, RBAK_PV, RBAK_TAR and RBAK_ZSTD environment variables.

EXAMPLES:
    # Back up /etc and /srv from a host into a local artifact
    rbak backup --host backup-host --archive host.tar.zst /etc /srv

    # Inspect an artifact as a tree
    rbak list --archive host.tar.zst

    # Rehearse a restore into a local directory
    rbak test-restore --archive host.tar.zst --output-dir /tmp/rehearsal

    # Restore to the remote host under a prefix
    rbak restore --host backup-host --archive host.tar.zst --remote-prefix /restore"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct CommonArgs {
    // Transport
    /// Remote host to archive from or restore to
    #[arg(long, value_name = "HOST", help_heading = "Transport")]
    host: Option<String>,

    /// Transport port
    #[arg(long, value_name = "PORT", help_heading = "Transport")]
    port: Option<u16>,

    /// Identity file passed to the transport
    #[arg(long, value_name = "PATH", help_heading = "Transport")]
    identity: Option<std::path::PathBuf>,

    /// Transport keepalive interval in seconds
    #[arg(
        long,
        default_value = "15",
        value_name = "N",
        help_heading = "Transport"
    )]
    keepalive_interval: u64,

    /// Transport keepalive retry count before giving up
    #[arg(
        long,
        default_value = "3",
        value_name = "N",
        help_heading = "Transport"
    )]
    keepalive_count: u32,

    // Privilege elevation
    /// Privilege-elevation command prefixed to remote archiver invocations
    #[arg(long, value_name = "CMD", help_heading = "Privilege elevation")]
    remote_sudo: Option<String>,

    /// Privilege-elevation command prefixed to local extraction
    #[arg(long, value_name = "CMD", help_heading = "Privilege elevation")]
    local_sudo: Option<String>,

    // Compression
    /// Compression level (1-22)
    #[arg(
        long,
        default_value = "19",
        value_name = "N",
        help_heading = "Compression"
    )]
    level: u32,

    /// Compressor worker threads (0 = all cores)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Compression"
    )]
    threads: u32,

    // Metadata preservation (preserved by default)
    /// Do not preserve POSIX ACLs
    #[arg(long, help_heading = "Metadata preservation")]
    no_acls: bool,

    /// Do not preserve extended attributes
    #[arg(long, help_heading = "Metadata preservation")]
    no_xattrs: bool,

    // Paths
    /// Archive artifact path (backup defaults to <host>-<timestamp>.tar.zst)
    #[arg(long, value_name = "PATH", help_heading = "Paths")]
    archive: Option<std::path::PathBuf>,

    /// Local directory test-restore extracts into
    #[arg(long, value_name = "PATH", help_heading = "Paths")]
    output_dir: Option<std::path::PathBuf>,

    /// Remote directory restore extracts into
    #[arg(long, value_name = "PREFIX", help_heading = "Paths")]
    remote_prefix: Option<String>,

    /// Exclude pattern passed to the archiver (can be specified multiple times)
    #[arg(long, value_name = "PATTERN", action = clap::ArgAction::Append, help_heading = "Paths")]
    exclude: Vec<String>,

    // Progress & output
    /// Pipe the stream through a progress meter
    #[arg(long, help_heading = "Progress & output")]
    progress: bool,

    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Validate, log the assembled commands and exit without running them
    #[arg(long, help_heading = "Progress & output")]
    dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Archive remote source paths into a local compressed artifact
    Backup {
        #[command(flatten)]
        common: CommonArgs,

        /// Source path(s) on the remote host
        #[arg(value_name = "PATH")]
        sources: Vec<String>,
    },
    /// Render the members of an artifact as an indented tree
    List {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Extract an artifact into a local directory as a restore rehearsal
    TestRestore {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Stream an artifact back to the remote host and extract it there
    Restore {
        #[command(flatten)]
        common: CommonArgs,
    },
}

fn build_config(common: &CommonArgs, sources: &[String]) -> Config {
    Config {
        host: common.host.clone(),
        port: common.port,
        identity: common.identity.clone(),
        keepalive_interval_sec: common.keepalive_interval,
        keepalive_count_max: common.keepalive_count,
        remote_sudo: common.remote_sudo.clone(),
        local_sudo: common.local_sudo.clone(),
        level: common.level,
        threads: common.threads,
        acls: !common.no_acls,
        xattrs: !common.no_xattrs,
        archive: common.archive.clone(),
        remote_prefix: common.remote_prefix.clone(),
        output_dir: common.output_dir.clone(),
        excludes: common.exclude.clone(),
        sources: sources.to_vec(),
        dry_run: common.dry_run,
        verbose: common.verbose,
        progress: common.progress,
        tools: ToolPaths::from_env(),
    }
}

fn main() {
    let args = Args::parse();
    let (operation, config) = match &args.command {
        Command::Backup { common, sources } => (Operation::Backup, build_config(common, sources)),
        Command::List { common } => (Operation::List, build_config(common, &[])),
        Command::TestRestore { common } => (Operation::TestRestore, build_config(common, &[])),
        Command::Restore { common } => (Operation::Restore, build_config(common, &[])),
    };
    let output = common::OutputConfig {
        verbose: config.verbose,
    };
    let result = common::run(&output, || async move {
        match operation {
            Operation::Backup => common::ops::backup(&config).await.map(|()| None),
            Operation::List => common::ops::list(&config).await.map(Some),
            Operation::TestRestore => common::ops::test_restore(&config).await.map(|()| None),
            Operation::Restore => common::ops::restore(&config).await.map(|()| None),
        }
    });
    match result {
        Some(Some(rendered)) => print!("{rendered}"),
        Some(None) => {}
        None => std::process::exit(1),
    }
}
