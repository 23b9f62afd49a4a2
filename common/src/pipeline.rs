//! Staged process pipelines
//!
//! A pipeline is an ordered sequence of external processes wired
//! stdout-to-stdin by anonymous pipes. All stages run concurrently with
//! implicit back-pressure; the pipeline succeeds only if every stage
//! exits zero, and the first (leftmost) failing stage is reported.

use std::process::Stdio;

use crate::errors::{Error, Result};

/// One stage of a pipeline: a named argument vector.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: String,
    pub argv: Vec<String>,
}

impl StageSpec {
    pub fn new(name: &str, argv: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            argv,
        }
    }

    /// The command line this stage runs, for dry-run logging.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Where the first stage reads from.
#[derive(Debug)]
pub enum Source {
    Null,
    File(std::path::PathBuf),
}

/// Where the last stage writes to.
#[derive(Debug)]
pub enum Sink {
    Null,
    File(std::path::PathBuf),
    Capture,
}

fn spawn_error(binary: &str, error: std::io::Error) -> Error {
    if error.kind() == std::io::ErrorKind::NotFound {
        Error::Environment {
            binary: binary.to_string(),
        }
    } else {
        Error::Io(error)
    }
}

/// Spawn all stages and wait for every one of them.
///
/// Returns the captured stdout of the last stage when `sink` is
/// [`Sink::Capture`], an empty buffer otherwise. An interrupt kills all
/// live stages and surfaces as [`Error::Interrupted`].
pub async fn run(stages: &[StageSpec], source: Source, sink: Sink) -> Result<Vec<u8>> {
    assert!(!stages.is_empty(), "pipeline must have at least one stage");
    let last = stages.len() - 1;
    let capture = matches!(sink, Sink::Capture);
    let mut children: Vec<(String, tokio::process::Child)> = Vec::with_capacity(stages.len());
    let mut previous_stdout: Option<tokio::process::ChildStdout> = None;

    for (index, stage) in stages.iter().enumerate() {
        let mut command = tokio::process::Command::new(&stage.argv[0]);
        command.args(&stage.argv[1..]);
        command.stderr(Stdio::inherit());
        command.kill_on_drop(true);

        if index == 0 {
            match &source {
                Source::Null => {
                    command.stdin(Stdio::null());
                }
                Source::File(path) => {
                    command.stdin(Stdio::from(std::fs::File::open(path)?));
                }
            }
        } else {
            let upstream = previous_stdout
                .take()
                .expect("previous stage was spawned with piped stdout");
            let stdin: Stdio = upstream.try_into()?;
            command.stdin(stdin);
        }

        if index == last {
            match &sink {
                Sink::Null => {
                    command.stdout(Stdio::null());
                }
                Sink::File(path) => {
                    command.stdout(Stdio::from(std::fs::File::create(path)?));
                }
                Sink::Capture => {
                    command.stdout(Stdio::piped());
                }
            }
        } else {
            command.stdout(Stdio::piped());
        }

        tracing::debug!("spawning stage '{}': {}", stage.name, stage.display());
        let mut child = command
            .spawn()
            .map_err(|error| spawn_error(&stage.argv[0], error))?;
        if index != last {
            previous_stdout = child.stdout.take();
        }
        children.push((stage.name.clone(), child));
    }

    let mut captured_stdout = if capture {
        children.last_mut().and_then(|(_, child)| child.stdout.take())
    } else {
        None
    };

    let wait_all = async {
        let mut output = Vec::new();
        // drain the capture pipe before waiting so a chatty last stage
        // cannot block on a full pipe
        if let Some(stdout) = captured_stdout.as_mut() {
            use tokio::io::AsyncReadExt;
            stdout.read_to_end(&mut output).await?;
        }
        let mut statuses = Vec::with_capacity(children.len());
        for (name, child) in children.iter_mut() {
            let status = child.wait().await?;
            statuses.push((name.clone(), status));
        }
        Ok::<_, std::io::Error>((output, statuses))
    };

    tokio::select! {
        result = wait_all => {
            let (output, statuses) = result?;
            for (name, status) in &statuses {
                if !status.success() {
                    tracing::debug!("stage '{}' exited with {:?}", name, status.code());
                    return Err(Error::Pipeline {
                        stage: name.clone(),
                        status: status.code().unwrap_or(-1),
                    });
                }
            }
            Ok(output)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received, terminating pipeline");
            for (_, child) in children.iter_mut() {
                let _ = child.start_kill();
            }
            for (_, child) in children.iter_mut() {
                let _ = child.wait().await;
            }
            Err(Error::Interrupted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str, argv: &[&str]) -> StageSpec {
        StageSpec::new(name, argv.iter().map(|a| a.to_string()).collect())
    }

    #[tokio::test]
    async fn single_stage_capture() {
        let out = run(
            &[stage("echo", &["sh", "-c", "printf hello"])],
            Source::Null,
            Sink::Capture,
        )
        .await
        .unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn stages_are_wired_stdout_to_stdin() {
        let out = run(
            &[
                stage("produce", &["sh", "-c", "printf 'b\\na\\nc\\n'"]),
                stage("sort", &["sort"]),
            ],
            Source::Null,
            Sink::Capture,
        )
        .await
        .unwrap();
        assert_eq!(out, b"a\nb\nc\n");
    }

    #[tokio::test]
    async fn first_failing_stage_is_reported() {
        let err = run(
            &[
                stage("produce", &["sh", "-c", "exit 3"]),
                stage("consume", &["cat"]),
            ],
            Source::Null,
            Sink::Null,
        )
        .await
        .unwrap_err();
        match err {
            Error::Pipeline { stage, status } => {
                assert_eq!(stage, "produce");
                assert_eq!(status, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn failure_in_any_stage_fails_the_pipeline() {
        // the last stage succeeds; a middle stage failure must still fail
        let err = run(
            &[
                stage("produce", &["sh", "-c", "printf x"]),
                stage("filter", &["sh", "-c", "cat >/dev/null; exit 7"]),
                stage("consume", &["cat"]),
            ],
            Source::Null,
            Sink::Null,
        )
        .await
        .unwrap_err();
        match err {
            Error::Pipeline { stage, status } => {
                assert_eq!(stage, "filter");
                assert_eq!(status, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_an_environment_error() {
        let err = run(
            &[stage("ghost", &["rbak-test-no-such-binary"])],
            Source::Null,
            Sink::Null,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Environment { binary } if binary == "rbak-test-no-such-binary"));
    }

    #[tokio::test]
    async fn file_source_and_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        std::fs::write(&input, "payload").unwrap();
        run(
            &[stage("copy", &["cat"])],
            Source::File(input),
            Sink::File(output.clone()),
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "payload");
    }
}
