//! Run a child CLI unchanged from the user's point of view while keeping a
//! copy of its stdout.
//!
//! Stdin is inherited. Stdout and stderr are relayed line by line on two
//! scoped threads; only the stdout relay captures, and both are joined before
//! the child is reaped.

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use thiserror::Error;
use which::which;
use crate::models::ChildOutcome;

#[derive(Debug, Error)]
pub enum WrapError {
    #[error("'{0}' command not found in PATH")]
    NotFound(String),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open {0} pipe")]
    Pipe(&'static str),
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Locate `name` on PATH. A name containing a path separator is taken as is.
pub fn resolve_executable(name: &str) -> Result<PathBuf, WrapError> {
    which(name).map_err(|_| WrapError::NotFound(name.to_string()))
}

/// Run `program`, tee its stdout to our stdout and capture it, relay its
/// stderr to our stderr.
pub fn run_and_capture<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
) -> Result<ChildOutcome, WrapError> {
    run_and_capture_to(program, args, io::stdout(), io::stderr())
}

pub fn run_and_capture_to<S, O, E>(
    program: &Path,
    args: &[S],
    out: O,
    err: E,
) -> Result<ChildOutcome, WrapError>
where
    S: AsRef<OsStr>,
    O: Write + Send,
    E: Write + Send,
{
    let display = program.display().to_string();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| WrapError::Spawn { program: display.clone(), source })?;

    let (child_out, child_err) = match (child.stdout.take(), child.stderr.take()) {
        (Some(o), Some(e)) => (o, e),
        (o, _) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(WrapError::Pipe(if o.is_none() { "stdout" } else { "stderr" }));
        }
    };

    let lines = tee_streams(child_out, child_err, out, err);

    let status = child
        .wait()
        .map_err(|source| WrapError::Wait { program: display, source })?;

    Ok(ChildOutcome {
        exit_code: exit_code(status),
        captured: join_captured(&lines),
    })
}

/// Run `program` with fully inherited stdio, nothing captured. Returns the
/// exit code to propagate.
pub fn run_direct<S: AsRef<OsStr>>(program: &str, args: &[S]) -> i32 {
    let path = match resolve_executable(program) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match Command::new(&path).args(args).status() {
        Ok(status) => exit_code(status),
        Err(e) => {
            eprintln!("Error starting {}: {}", program, e);
            1
        }
    }
}

/// Relay both streams concurrently and hand back the captured stdout lines.
/// Returns only once both streams have reached end of stream.
fn tee_streams<R1, R2, O, E>(child_out: R1, child_err: R2, mut out: O, mut err: E) -> Vec<String>
where
    R1: Read + Send,
    R2: Read + Send,
    O: Write + Send,
    E: Write + Send,
{
    thread::scope(|s| {
        let stdout_relay = s.spawn(move || relay_lines(child_out, &mut out, true));
        let stderr_relay = s.spawn(move || relay_lines(child_err, &mut err, false));

        let captured = stdout_relay.join().unwrap_or_else(|_| {
            eprintln!("Error reading stdout: relay thread panicked");
            Vec::new()
        });
        if stderr_relay.join().is_err() {
            eprintln!("Error reading stderr: relay thread panicked");
        }
        captured
    })
}

/// Copy `reader` to `sink` one line at a time, flushing after each line.
/// Bytes reach the sink untouched; only the captured copy, collected when
/// `capture` is set, is decoded (lossily) with terminators stripped.
fn relay_lines<R: Read, W: Write>(reader: R, sink: &mut W, capture: bool) -> Vec<String> {
    let mut reader = BufReader::new(reader);
    let mut captured = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = strip_terminator(&buf);
                let written = sink
                    .write_all(line)
                    .and_then(|_| sink.write_all(b"\n"))
                    .and_then(|_| sink.flush());
                if let Err(e) = written {
                    log::debug!("relay write failed: {}", e);
                }
                if capture {
                    captured.push(String::from_utf8_lossy(line).into_owned());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let stream = if capture { "stdout" } else { "stderr" };
                eprintln!("Error reading {}: {}", stream, e);
                break;
            }
        }
    }

    captured
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn join_captured(lines: &[String]) -> String {
    lines.join("\n").trim().to_string()
}

/// Normal termination keeps its code; a signal or missing code maps to 1.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
