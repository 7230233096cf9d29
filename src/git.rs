use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use crate::models::RepoInfo;

/// Origin, branch and short commit of the repository containing the current
/// directory. `None` when there is no origin; branch and commit are optional.
pub fn detect_repo_info(timeout: Duration) -> Option<RepoInfo> {
    let origin_url = run_git_command(&["remote", "get-url", "origin"], timeout)?;
    let branch = run_git_command(&["branch", "--show-current"], timeout);
    let commit = run_git_command(&["rev-parse", "--short", "HEAD"], timeout);

    Some(RepoInfo {
        repo_name: extract_repo_name(&origin_url),
        origin_url,
        branch,
        commit,
    })
}

/// Turn a remote URL into an `org/repo` style name.
///
///   https://github.com/user/repo.git       -> user/repo
///   git@github.com:user/repo.git           -> user/repo
///   ssh://git@github.com:22/user/repo.git  -> user/repo
pub fn extract_repo_name(url: &str) -> String {
    let url = url.trim();
    let url = url.strip_suffix(".git").unwrap_or(url);

    if url.starts_with("https://") || url.starts_with("http://") {
        let parts: Vec<&str> = url.split('/').collect();
        // scheme, "", host, owner, repo...
        if parts.len() >= 5 {
            return parts[3..].join("/");
        }
    }

    if let Some(rest) = url.strip_prefix("ssh://") {
        if let Some(idx) = rest.find('/') {
            return rest[idx + 1..].to_string();
        }
    }

    if url.contains('@') {
        if let Some((_, path)) = url.rsplit_once(':') {
            return path.to_string();
        }
    }

    url.to_string()
}

fn run_git_command(args: &[&str], timeout: Duration) -> Option<String> {
    run_with_timeout("git", args, timeout)
}

/// Trimmed stdout of a successful run, or `None` on failure, timeout or empty
/// output. Stdout is drained while the child runs so a full pipe cannot stall it.
fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| log::debug!("{} {:?} failed to start: {}", program, args, e))
        .ok()?;

    let mut stdout = child.stdout.take()?;
    let reader = thread::spawn(move || {
        let mut output = String::new();
        stdout.read_to_string(&mut output).map(|_| output)
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) if start.elapsed() > timeout => {
                let _ = child.kill();
                let _ = child.wait();
                log::debug!("{} {:?} timed out after {:?}", program, args, timeout);
                break None;
            }
            Ok(None) => thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                log::debug!("{} {:?} wait failed: {}", program, args, e);
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };

    // The pipe closes once the child is gone, so the reader always finishes.
    let output = reader.join().ok()?.ok()?;
    if !status?.success() {
        return None;
    }

    let output = output.trim();
    if output.is_empty() {
        None
    } else {
        Some(output.to_string())
    }
}
