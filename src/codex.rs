//! `notify-codex`: Codex posts one JSON event on stdin per notification.
//!
//! Nothing in here may fail the calling tool, so every error path ends in a
//! silent return and the process exits 0.

use serde::Deserialize;
use serde_json::Value;
use std::io::{self, IsTerminal, Read, Write};
use crate::config::Config;
use crate::hooks::{new_session_id, HookContext};
use crate::models::Service;

#[derive(Debug, Deserialize)]
pub struct CodexEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

pub fn notify_codex(config: &Config) {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return;
    }

    let mut body = String::new();
    if let Err(e) = stdin.lock().read_to_string(&mut body) {
        log::debug!("could not read codex event: {}", e);
        return;
    }

    let event: CodexEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            log::debug!("ignoring malformed codex event: {}", e);
            return;
        }
    };

    let mut ctx = match HookContext::init(Service::CodexCli, config) {
        Ok(ctx) => ctx,
        Err(e) => {
            log::debug!("session store unavailable: {}", e);
            return;
        }
    };

    handle_event(&mut ctx, &event);
}

pub fn handle_event<W: Write>(ctx: &mut HookContext<W>, event: &CodexEvent) {
    match event.kind.as_str() {
        "agent-turn-complete" => {
            if let Some(response) = extract_response(&event.data) {
                log_response(ctx, response);
            }
        }
        "session_start" => session_start(ctx),
        "session_end" => session_end(ctx),
        other => log::debug!("ignoring codex event type {:?}", other),
    }
}

/// The response may sit at `data.response` or one level deeper at
/// `data.data.response`; the flat shape is tried first. Empty counts as absent.
pub fn extract_response(data: &Value) -> Option<&str> {
    let flat = data.get("response").and_then(Value::as_str);
    let nested = || {
        data.get("data")
            .and_then(|d| d.get("response"))
            .and_then(Value::as_str)
    };

    flat.filter(|r| !r.is_empty())
        .or_else(|| nested().filter(|r| !r.is_empty()))
}

fn log_response<W: Write>(ctx: &mut HookContext<W>, response: &str) {
    if !ctx.store.has_active() && ctx.store.set(&new_session_id()).is_err() {
        return;
    }

    let Ok(session_id) = ctx.store.get() else {
        return;
    };

    if let Err(e) = ctx.logger.log_assistant_response(&session_id, response) {
        log::warn!("failed to log codex response: {}", e);
    }
}

fn session_start<W: Write>(ctx: &mut HookContext<W>) {
    let session_id = new_session_id();
    if ctx.store.set(&session_id).is_err() {
        return;
    }
    if let Err(e) = ctx.logger.log_session_start(&session_id, None) {
        log::warn!("failed to log codex session start: {}", e);
    }
}

fn session_end<W: Write>(ctx: &mut HookContext<W>) {
    let Ok(session_id) = ctx.store.get() else {
        return;
    };

    if let Err(e) = ctx.logger.log_session_end(&session_id) {
        log::warn!("failed to log codex session end: {}", e);
    }
    if let Err(e) = ctx.store.clear() {
        eprintln!("Warning: failed to clear session: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::ConversationLogger;
    use crate::models::{UserIdentity, UserSource};
    use crate::session::SessionStore;
    use serde_json::json;
    use tempfile::tempdir;

    fn context(dir: &std::path::Path) -> HookContext<Vec<u8>> {
        let identity = UserIdentity {
            user_id: "carol".to_string(),
            source: UserSource::System,
            hostname: "devbox".to_string(),
        };
        HookContext {
            store: SessionStore::open(Some(dir)).unwrap(),
            logger: ConversationLogger::new(Service::CodexCli, identity, None, Vec::new()),
        }
    }

    fn event(body: Value) -> CodexEvent {
        serde_json::from_value(body).unwrap()
    }

    fn records(ctx: HookContext<Vec<u8>>) -> Vec<Value> {
        let out = String::from_utf8(ctx.logger.into_inner()).unwrap();
        out.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    #[test]
    fn test_extract_flat_response() {
        let data = json!({"response": "done"});
        assert_eq!(extract_response(&data), Some("done"));
    }

    #[test]
    fn test_extract_nested_response() {
        let data = json!({"data": {"response": "nested"}});
        assert_eq!(extract_response(&data), Some("nested"));
    }

    #[test]
    fn test_flat_shape_wins() {
        let data = json!({"response": "flat", "data": {"response": "nested"}});
        assert_eq!(extract_response(&data), Some("flat"));

        let data = json!({"response": "", "data": {"response": "nested"}});
        assert_eq!(extract_response(&data), Some("nested"));
    }

    #[test]
    fn test_extract_missing_or_empty() {
        assert_eq!(extract_response(&json!({})), None);
        assert_eq!(extract_response(&json!({"response": ""})), None);
        assert_eq!(extract_response(&json!({"response": 3})), None);
        assert_eq!(extract_response(&Value::Null), None);
    }

    #[test]
    fn test_turn_complete_mints_session() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());

        handle_event(&mut ctx, &event(json!({"type": "agent-turn-complete", "data": {"response": "hi"}})));
        let session_id = ctx.store.get().unwrap();

        let records = records(ctx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["service"], "codex-cli");
        assert_eq!(records[0]["role"], "assistant");
        assert_eq!(records[0]["content"], "hi");
        assert_eq!(records[0]["session_id"], session_id.as_str());
    }

    #[test]
    fn test_turn_complete_without_response_is_ignored() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());

        handle_event(&mut ctx, &event(json!({"type": "agent-turn-complete", "data": {}})));
        assert!(!ctx.store.has_active());
        assert!(records(ctx).is_empty());
    }

    #[test]
    fn test_session_start_replaces_existing() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.store.set("old-session").unwrap();

        handle_event(&mut ctx, &event(json!({"type": "session_start"})));
        let session_id = ctx.store.get().unwrap();
        assert_ne!(session_id, "old-session");

        let records = records(ctx);
        assert_eq!(records[0]["event"], "session_start");
        assert_eq!(records[0]["session_id"], session_id.as_str());
    }

    #[test]
    fn test_session_end() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());

        // No active session: nothing happens
        handle_event(&mut ctx, &event(json!({"type": "session_end"})));

        ctx.store.set("s-1").unwrap();
        handle_event(&mut ctx, &event(json!({"type": "session_end"})));
        assert!(!ctx.store.has_active());

        let records = records(ctx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["event"], "session_end");
        assert_eq!(records[0]["session_id"], "s-1");
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());

        handle_event(&mut ctx, &event(json!({"type": "approval-requested", "data": {"response": "x"}})));
        assert!(records(ctx).is_empty());
    }
}
