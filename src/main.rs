mod codex;
mod config;
mod gemini;
mod git;
mod hooks;
mod identity;
mod logger;
mod models;
mod session;
mod wrapper;

use clap::{Parser, Subcommand};
use std::env;
use std::error::Error;
use std::ffi::OsString;
use std::io::Stdout;
use std::process;
use config::Config;
use hooks::HookContext;
use models::Service;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COMMIT: Option<&str> = option_env!("TAPLINE_COMMIT");
const BUILD_DATE: Option<&str> = option_env!("TAPLINE_BUILD_DATE");

#[derive(Parser, Debug)]
#[command(name = "tapline", about = "Conversation logging hooks for AI coding assistants")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new conversation and log a session_start event
    #[command(name = "conversation_start")]
    ConversationStart,

    /// Log a session_end event and clear the current conversation
    #[command(name = "conversation_end")]
    ConversationEnd,

    /// Log a user prompt
    #[command(name = "user_prompt")]
    UserPrompt {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Log an assistant response
    #[command(name = "assistant_response")]
    AssistantResponse {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Run gemini, logging the prompt and its output
    #[command(name = "wrap-gemini", disable_help_flag = true)]
    WrapGemini {
        /// Passed to gemini untouched
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        #[allow(dead_code)]
        args: Vec<OsString>,
    },

    /// Log a Codex notification read from stdin
    #[command(name = "notify-codex")]
    NotifyCodex,

    /// Print version information
    Version,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help goes to stdout with success; every usage error exits 1.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::new().filter_or("TAPLINE_LOG", "warn"))
        .format_timestamp(None)
        .init();

    let config = Config::from_env();

    match args.command {
        Command::Version => {
            println!(
                "tapline {} (commit: {}, built: {})",
                VERSION,
                COMMIT.unwrap_or("none"),
                BUILD_DATE.unwrap_or("unknown")
            );
        }
        Command::WrapGemini { .. } => {
            // Taken from argv directly; clap drops a leading `--`.
            let args: Vec<OsString> = env::args_os().skip(2).collect();
            let code = gemini::wrap_gemini(&config, &args);
            process::exit(code);
        }
        Command::NotifyCodex => codex::notify_codex(&config),
        Command::ConversationStart => run_hook(&config, hooks::conversation_start),
        Command::ConversationEnd => run_hook(&config, hooks::conversation_end),
        Command::UserPrompt { text } => run_hook(&config, |ctx| hooks::user_prompt(ctx, &text)),
        Command::AssistantResponse { text } => {
            run_hook(&config, |ctx| hooks::assistant_response(ctx, &text))
        }
    }
}

/// Direct Claude Code hooks: any failure is reported and exits 1.
fn run_hook<F>(config: &Config, handler: F)
where
    F: FnOnce(&mut HookContext<Stdout>) -> Result<(), Box<dyn Error>>,
{
    let result = HookContext::init(Service::ClaudeCode, config)
        .map_err(|e| -> Box<dyn Error> {
            format!("Failed to initialize session manager: {}", e).into()
        })
        .and_then(|mut ctx| handler(&mut ctx));

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}
