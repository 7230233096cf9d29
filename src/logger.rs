//! Conversation records, one JSON object per line.
//!
//! Every call serializes a single record, writes it in one piece and flushes,
//! so a record survives even if the process is killed right afterwards.

use chrono::Local;
use std::collections::BTreeMap;
use std::io::{self, Stdout, Write};
use crate::models::{ConversationRecord, Event, RepoInfo, Role, Service, UserIdentity};

pub struct ConversationLogger<W: Write> {
    service: Service,
    identity: UserIdentity,
    repo: Option<RepoInfo>,
    out: W,
}

impl ConversationLogger<Stdout> {
    pub fn stdout(service: Service, identity: UserIdentity, repo: Option<RepoInfo>) -> Self {
        Self::new(service, identity, repo, io::stdout())
    }
}

impl<W: Write> ConversationLogger<W> {
    pub fn new(service: Service, identity: UserIdentity, repo: Option<RepoInfo>, out: W) -> Self {
        ConversationLogger { service, identity, repo, out }
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn log_user_prompt(&mut self, session_id: &str, content: &str) -> io::Result<()> {
        let record = self.record(session_id, Role::User, content, None, None);
        self.write(&record)
    }

    pub fn log_assistant_response(&mut self, session_id: &str, content: &str) -> io::Result<()> {
        let record = self.record(session_id, Role::Assistant, content, None, None);
        self.write(&record)
    }

    pub fn log_session_start(
        &mut self,
        session_id: &str,
        metadata: Option<BTreeMap<String, String>>,
    ) -> io::Result<()> {
        let metadata = metadata.filter(|m| !m.is_empty());
        let record = self.record(session_id, Role::System, "", Some(Event::SessionStart), metadata);
        self.write(&record)
    }

    pub fn log_session_end(&mut self, session_id: &str) -> io::Result<()> {
        let record = self.record(session_id, Role::System, "", Some(Event::SessionEnd), None);
        self.write(&record)
    }

    fn record(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        event: Option<Event>,
        metadata: Option<BTreeMap<String, String>>,
    ) -> ConversationRecord {
        let repo = self.repo.as_ref();
        ConversationRecord {
            time: Local::now(),
            level: "INFO",
            msg: "conversation",
            service: self.service.as_str(),
            session_id: session_id.to_string(),
            user_id: self.identity.user_id.clone(),
            user_source: self.identity.source,
            hostname: self.identity.hostname.clone(),
            git_repo_url: repo.map(|r| r.origin_url.clone()),
            git_repo_name: repo.map(|r| r.repo_name.clone()),
            git_branch: repo.and_then(|r| r.branch.clone()),
            git_commit: repo.and_then(|r| r.commit.clone()),
            role,
            content: content.to_string(),
            event,
            metadata,
        }
    }

    fn write(&mut self, record: &ConversationRecord) -> io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.out.write_all(&line)?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
