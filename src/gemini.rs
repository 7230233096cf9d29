use std::ffi::OsString;
use crate::config::Config;
use crate::hooks::{new_session_id, HookContext};
use crate::models::Service;
use crate::session::SessionStore;
use crate::wrapper;

/// `wrap-gemini`: run gemini with its output teed and logged. Returns the
/// exit code for this process.
///
/// Logging is best effort. If the session store is unusable gemini still
/// runs, just without capture.
pub fn wrap_gemini(config: &Config, args: &[OsString]) -> i32 {
    let store = match SessionStore::open(config.state_dir.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Warning: tapline session manager unavailable, logging disabled");
            log::debug!("session store: {}", e);
            return wrapper::run_direct(&config.gemini_bin, args);
        }
    };

    // Resolve before writing anything so a missing binary leaves no records.
    let program = match wrapper::resolve_executable(&config.gemini_bin) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut ctx = HookContext::with_store(Service::GeminiCli, store, config);

    if !ctx.store.has_active() {
        let session_id = new_session_id();
        if ctx.store.set(&session_id).is_err() {
            return wrapper::run_direct(&config.gemini_bin, args);
        }
        if let Err(e) = ctx.logger.log_session_start(&session_id, None) {
            log::warn!("failed to log session start: {}", e);
        }
    }

    let session_id = match ctx.store.get() {
        Ok(id) => id,
        Err(_) => return wrapper::run_direct(&config.gemini_bin, args),
    };

    if !args.is_empty() {
        let prompt = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        if let Err(e) = ctx.logger.log_user_prompt(&session_id, &prompt) {
            log::warn!("failed to log prompt: {}", e);
        }
    }

    // Ctrl+C reaches gemini through the terminal's process group. We stay up
    // to log what it printed and hand back its status.
    if let Err(e) = ctrlc::set_handler(|| {}) {
        log::debug!("could not install interrupt handler: {}", e);
    }

    let outcome = match wrapper::run_and_capture(&program, args) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if !outcome.captured.is_empty() {
        if let Err(e) = ctx.logger.log_assistant_response(&session_id, &outcome.captured) {
            log::warn!("failed to log response: {}", e);
        }
    }

    outcome.exit_code
}
