use std::env;
use sha2::{Sha256, Digest};
use sysinfo::System;
use crate::models::{Service, UserIdentity, UserSource};

const USER_ID_VAR: &str = "TAPLINE_USER_ID";
const SYSTEM_USER_VAR: &str = "USER";
const ANONYMOUS: &str = "anonymous";

/// Resolve who is speaking from the process environment.
pub fn resolve(service: Service) -> UserIdentity {
    resolve_with(service, |key| env::var(key).ok(), hostname())
}

/// Resolution order: explicit override, hashed service API key, system user,
/// then anonymous. Empty values count as unset.
pub fn resolve_with<F>(service: Service, lookup: F, hostname: String) -> UserIdentity
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let (user_id, source) = if let Some(id) = get(USER_ID_VAR) {
        (id, UserSource::Env)
    } else if let Some(key) = service.api_key_vars().iter().find_map(|var| get(*var)) {
        (hash_api_key(&key), UserSource::ApiKeyHash)
    } else if let Some(user) = get(SYSTEM_USER_VAR) {
        (user, UserSource::System)
    } else {
        (ANONYMOUS.to_string(), UserSource::Anonymous)
    };

    UserIdentity { user_id, source, hostname }
}

/// First 8 bytes of SHA-256 over the full key, hex encoded. The raw key is
/// never kept.
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hostname() -> String {
    System::host_name()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve_from(service: Service, vars: &[(&str, &str)]) -> UserIdentity {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        resolve_with(service, |key| vars.get(key).cloned(), "host-a".to_string())
    }

    #[test]
    fn test_precedence() {
        let all = [
            ("TAPLINE_USER_ID", "alice"),
            ("ANTHROPIC_API_KEY", "sk-ant-123"),
            ("USER", "bob"),
        ];

        let id = resolve_from(Service::ClaudeCode, &all);
        assert_eq!(id.user_id, "alice");
        assert_eq!(id.source, UserSource::Env);
        assert_eq!(id.hostname, "host-a");

        let id = resolve_from(Service::ClaudeCode, &all[1..]);
        assert_eq!(id.user_id, hash_api_key("sk-ant-123"));
        assert_eq!(id.source, UserSource::ApiKeyHash);

        let id = resolve_from(Service::ClaudeCode, &all[2..]);
        assert_eq!(id.user_id, "bob");
        assert_eq!(id.source, UserSource::System);

        let id = resolve_from(Service::ClaudeCode, &[]);
        assert_eq!(id.user_id, "anonymous");
        assert_eq!(id.source, UserSource::Anonymous);
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let id = resolve_from(Service::ClaudeCode, &[("TAPLINE_USER_ID", ""), ("USER", "bob")]);
        assert_eq!(id.source, UserSource::System);
    }

    #[test]
    fn test_api_key_is_service_specific() {
        let vars = [("ANTHROPIC_API_KEY", "sk-ant"), ("USER", "bob")];
        let id = resolve_from(Service::GeminiCli, &vars);
        assert_eq!(id.source, UserSource::System);

        let id = resolve_from(Service::GeminiCli, &[("GOOGLE_API_KEY", "g-key")]);
        assert_eq!(id.user_id, hash_api_key("g-key"));

        let id = resolve_from(
            Service::GeminiCli,
            &[("GEMINI_API_KEY", "gem-key"), ("GOOGLE_API_KEY", "g-key")],
        );
        assert_eq!(id.user_id, hash_api_key("gem-key"));

        let id = resolve_from(Service::CodexCli, &[("OPENAI_API_KEY", "sk-openai")]);
        assert_eq!(id.source, UserSource::ApiKeyHash);
    }

    #[test]
    fn test_hash_api_key() {
        // sha256("test") = 9f86d081884c7d65...
        assert_eq!(hash_api_key("test"), "9f86d081884c7d65");

        let a = hash_api_key("sk-ant-api03-aaaa");
        assert_eq!(a.len(), 16);
        assert_eq!(a, hash_api_key("sk-ant-api03-aaaa"));
        assert_ne!(a, hash_api_key("sk-ant-api03-aaab"));
        assert!(!a.contains("sk-ant"));
    }
}
