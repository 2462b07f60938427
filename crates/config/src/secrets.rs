//! Named secret indirection.
//!
//! Any string value in the config file may be written as `secret:<name>`.
//! The name is looked up through a [`SecretResolver`] before the config is
//! handed to the rest of the program.

use std::collections::HashMap;

/// Prefix marking a config value as a reference to a named secret.
pub const SECRET_PREFIX: &str = "secret:";

/// Looks up named secrets.
pub trait SecretResolver {
    /// Return the secret value for `name`, or `None` if it does not exist.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Resolves secrets from environment variables.
///
/// `github-token` is read from `GITHUB_TOKEN`, `openrouter.api-key` from
/// `OPENROUTER_API_KEY`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretResolver;

impl EnvSecretResolver {
    pub fn env_var_name(name: &str) -> String {
        name.chars()
            .map(|c| match c {
                '-' | '.' | '/' | ' ' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl SecretResolver for EnvSecretResolver {
    fn resolve(&self, name: &str) -> Option<String> {
        std::env::var(Self::env_var_name(name))
            .ok()
            .filter(|v| !v.is_empty())
    }
}

impl SecretResolver for HashMap<String, String> {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// If `value` is a secret reference, return the secret name.
pub fn secret_name(value: &str) -> Option<&str> {
    value.strip_prefix(SECRET_PREFIX).map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_names_are_screaming_snake() {
        assert_eq!(EnvSecretResolver::env_var_name("github-token"), "GITHUB_TOKEN");
        assert_eq!(
            EnvSecretResolver::env_var_name("openrouter.api-key"),
            "OPENROUTER_API_KEY"
        );
    }

    #[test]
    fn secret_references_are_detected() {
        assert_eq!(secret_name("secret:github-token"), Some("github-token"));
        assert_eq!(secret_name("ghp_plaintext"), None);
    }

    #[test]
    fn map_resolver_looks_up_names() {
        let mut secrets = HashMap::new();
        secrets.insert("github-token".to_string(), "ghp_abc".to_string());
        assert_eq!(secrets.resolve("github-token").as_deref(), Some("ghp_abc"));
        assert!(secrets.resolve("missing").is_none());
    }
}
