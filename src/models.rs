use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The host tool a record is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    ClaudeCode,
    GeminiCli,
    CodexCli,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::ClaudeCode => "claude-code",
            Service::GeminiCli => "gemini-cli",
            Service::CodexCli => "codex-cli",
        }
    }

    /// API key variables consulted for identity, in order of preference.
    pub fn api_key_vars(&self) -> &'static [&'static str] {
        match self {
            Service::ClaudeCode => &["ANTHROPIC_API_KEY"],
            Service::GeminiCli => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Service::CodexCli => &["OPENAI_API_KEY"],
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    SessionStart,
    SessionEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSource {
    Env,
    ApiKeyHash,
    System,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub source: UserSource,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub origin_url: String,
    pub repo_name: String,
    pub branch: Option<String>,
    pub commit: Option<String>,
}

/// One line of the conversation log. Field order is the key order on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRecord {
    pub time: DateTime<Local>,
    pub level: &'static str,
    pub msg: &'static str,
    pub service: &'static str,
    pub session_id: String,
    pub user_id: String,
    pub user_source: UserSource,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repo_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// What a wrapped child left behind: its exit code and the captured stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildOutcome {
    pub exit_code: i32,
    pub captured: String,
}
