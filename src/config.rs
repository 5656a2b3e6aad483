use serde::Deserialize;
use std::{env, fmt, fs, path::PathBuf};

use crate::db::DatabaseConfig;

/// Default session token lifetime: seven days.
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Default bcrypt work factor.
pub const DEFAULT_BCRYPT_COST: u32 = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Authentication settings. Loaded once at start and read-only afterwards.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    /// Lifetime of a session token
    pub token_ttl_seconds: u64,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl AppConfig {
    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "No JWT secret configured (set QUILL_JWT_SECRET or auth.jwt_secret)"
            ));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(anyhow::anyhow!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            ));
        }
        Ok(())
    }
}

/// Locate the configuration file, if any.
///
/// `QUILL_CONFIG` wins; otherwise `./quill.json` is used when present.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("QUILL_CONFIG") {
        return Some(PathBuf::from(p));
    }

    let candidate = PathBuf::from("quill.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}

/// Load configuration from `path`, or defaults when no file is given.
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };

    let raw = fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {}", path.display(), e))?;
    let config: AppConfig = serde_json::from_str(&expand_env_vars(&raw))?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.auth.token_ttl_seconds, DEFAULT_TOKEN_TTL_SECONDS);
        assert_eq!(config.auth.bcrypt_cost, DEFAULT_BCRYPT_COST);
        assert!(config.validate().is_err(), "missing secret must be rejected");
    }

    #[test]
    fn test_load_from_file_with_env_expansion() {
        // SAFETY: test-local variable name, not read elsewhere
        unsafe { env::set_var("QUILL_TEST_SECRET_FOR_CONFIG", "s3cr3t") };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "server": {{ "bind": "127.0.0.1:9999" }},
                "database": {{ "url": "memory", "namespace": "ns", "database": "db" }},
                "auth": {{ "jwt_secret": "${{QUILL_TEST_SECRET_FOR_CONFIG}}", "bcrypt_cost": 5 }}
            }}"#
        )
        .unwrap();

        let config = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert_eq!(config.database.namespace, "ns");
        assert_eq!(config.auth.jwt_secret, "s3cr3t");
        assert_eq!(config.auth.bcrypt_cost, 5);
        assert_eq!(config.auth.token_ttl_seconds, DEFAULT_TOKEN_TTL_SECONDS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_variables_are_left_alone() {
        assert_eq!(
            expand_env_vars("a-${QUILL_DEFINITELY_UNSET_VAR}-b"),
            "a-${QUILL_DEFINITELY_UNSET_VAR}-b"
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some(PathBuf::from("/nonexistent/quill.json")));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let auth = AuthConfig {
            jwt_secret: "hunter2hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", auth).contains("hunter2"));
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "x".to_string();
        config.auth.bcrypt_cost = 2;
        assert!(config.validate().is_err());
    }
}
