use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::io::{Stdout, Write};
use uuid::Uuid;
use crate::config::Config;
use crate::git;
use crate::identity;
use crate::logger::ConversationLogger;
use crate::models::Service;
use crate::session::{SessionError, SessionStore};

type HookResult = Result<(), Box<dyn Error>>;

/// Everything a handler needs, resolved once per invocation.
pub struct HookContext<W: Write> {
    pub store: SessionStore,
    pub logger: ConversationLogger<W>,
}

impl HookContext<Stdout> {
    /// Build the context for `service`. Fails only if the session store cannot
    /// be opened; identity and git context always resolve, possibly degraded.
    pub fn init(service: Service, config: &Config) -> Result<Self, SessionError> {
        let store = SessionStore::open(config.state_dir.as_deref())?;
        Ok(Self::with_store(service, store, config))
    }

    pub fn with_store(service: Service, store: SessionStore, config: &Config) -> Self {
        let identity = identity::resolve(service);
        let repo = git::detect_repo_info(config.git_timeout);
        log::debug!(
            "context for {}: session file {}, user={}, repo={:?}",
            service,
            store.path().display(),
            identity.user_id,
            repo
        );

        HookContext {
            store,
            logger: ConversationLogger::stdout(service, identity, repo),
        }
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn conversation_start<W: Write>(ctx: &mut HookContext<W>) -> HookResult {
    let session_id = new_session_id();
    ctx.store
        .set(&session_id)
        .map_err(|e| format!("Failed to set session ID: {}", e))?;

    let cwd = env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let mut metadata = BTreeMap::new();
    metadata.insert("hostname".to_string(), ctx.logger.identity().hostname.clone());
    metadata.insert("cwd".to_string(), cwd);

    ctx.logger.log_session_start(&session_id, Some(metadata))?;
    Ok(())
}

pub fn conversation_end<W: Write>(ctx: &mut HookContext<W>) -> HookResult {
    let session_id = current_session(&ctx.store)?;
    ctx.logger.log_session_end(&session_id)?;

    if let Err(e) = ctx.store.clear() {
        eprintln!("Failed to clear session: {}", e);
    }
    Ok(())
}

pub fn user_prompt<W: Write>(ctx: &mut HookContext<W>, words: &[String]) -> HookResult {
    let session_id = current_session(&ctx.store)?;
    ctx.logger.log_user_prompt(&session_id, &words.join(" "))?;
    Ok(())
}

pub fn assistant_response<W: Write>(ctx: &mut HookContext<W>, words: &[String]) -> HookResult {
    let session_id = current_session(&ctx.store)?;
    ctx.logger.log_assistant_response(&session_id, &words.join(" "))?;
    Ok(())
}

fn current_session(store: &SessionStore) -> Result<String, String> {
    store
        .get()
        .map_err(|e| format!("Failed to get session ID: {}", e))
}
