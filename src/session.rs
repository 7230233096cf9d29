use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SESSION_FILE: &str = "session_id";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to get user home directory")]
    NoHomeDir,
    #[error("failed to create session directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no active session found")]
    NoActiveSession,
    #[error("session file is empty")]
    EmptySessionFile,
    #[error("session ID cannot be empty")]
    EmptyId,
    #[error("failed to read session file: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write session file: {0}")]
    Write(#[source] io::Error),
    #[error("failed to remove session file: {0}")]
    Remove(#[source] io::Error),
}

/// Single-slot store for the current conversation's session id.
///
/// There is no locking: concurrent invocations race and the last write wins.
#[derive(Debug, Clone)]
pub struct SessionStore {
    session_file: PathBuf,
}

impl SessionStore {
    /// Open the store under `dir`, creating the directory if needed.
    /// A `None` dir means no home directory could be resolved.
    pub fn open(dir: Option<&Path>) -> Result<Self, SessionError> {
        let dir = dir.ok_or(SessionError::NoHomeDir)?;
        create_private_dir(dir).map_err(|source| SessionError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(SessionStore {
            session_file: dir.join(SESSION_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.session_file
    }

    pub fn get(&self) -> Result<String, SessionError> {
        let id = match fs::read_to_string(&self.session_file) {
            Ok(id) => id,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SessionError::NoActiveSession)
            }
            Err(e) => return Err(SessionError::Read(e)),
        };

        if id.is_empty() {
            return Err(SessionError::EmptySessionFile);
        }
        Ok(id)
    }

    pub fn set(&self, session_id: &str) -> Result<(), SessionError> {
        if session_id.is_empty() {
            return Err(SessionError::EmptyId);
        }

        fs::write(&self.session_file, session_id).map_err(SessionError::Write)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.session_file, fs::Permissions::from_mode(0o600))
                .map_err(SessionError::Write)?;
        }

        log::debug!("session set to {}", session_id);
        Ok(())
    }

    /// Remove the current session. Clearing an absent session is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.session_file) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Remove(e)),
        }
    }

    pub fn has_active(&self) -> bool {
        self.get().is_ok()
    }
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
    }
}
