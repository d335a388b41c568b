//! Configuration loading and validation for engram.
//!
//! Everything comes from environment variables — no credentials on disk.
//! Validation happens once at startup; a bad value is a fatal configuration
//! error (CLI exit code 2), never a runtime surprise.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while loading configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {name}")]
    MissingVar { name: &'static str },

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Reference embedding dimension (nomic-embed-text).
pub const EMBEDDING_DIM_DEFAULT: usize = 768;

/// Default HNSW query-time candidate list size.
pub const EF_SEARCH_DEFAULT: u16 = 64;

/// The engram runtime configuration.
#[derive(Clone, Serialize)]
pub struct EngramConfig {
    /// PostgreSQL connection string (`ENGRAM_DATABASE_URL`)
    #[serde(skip)]
    pub database_url: String,

    /// Chat endpoint root, OpenAI-compatible (`ENGRAM_CHAT_URL`)
    pub chat_url: String,

    /// Embedding endpoint root (`ENGRAM_EMBED_URL`, defaults to the chat URL)
    pub embed_url: String,

    /// Bearer token for hosted endpoints (`ENGRAM_API_KEY`)
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Chat model identifier (`ENGRAM_CHAT_MODEL`)
    pub chat_model: String,

    /// Embedding model identifier (`ENGRAM_EMBED_MODEL`)
    pub embed_model: String,

    /// Embedding dimension, fixed per deployment (`ENGRAM_EMBED_DIM`)
    pub embedding_dim: usize,

    /// Root under which per-agent workspaces are created (`ENGRAM_WORKSPACE`)
    pub workspace_root: PathBuf,

    /// Chat sampling temperature (`ENGRAM_TEMPERATURE`)
    pub temperature: f32,

    /// HNSW `ef_search` for archival queries (`ENGRAM_EF_SEARCH`)
    pub ef_search: u16,
}

impl std::fmt::Debug for EngramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngramConfig")
            .field("database_url", &"[REDACTED]")
            .field("chat_url", &self.chat_url)
            .field("embed_url", &self.embed_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("chat_model", &self.chat_model)
            .field("embed_model", &self.embed_model)
            .field("embedding_dim", &self.embedding_dim)
            .field("workspace_root", &self.workspace_root)
            .field("temperature", &self.temperature)
            .field("ef_search", &self.ef_search)
            .finish()
    }
}

impl EngramConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source (testable).
    pub fn load_from(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("ENGRAM_DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar {
                name: "ENGRAM_DATABASE_URL",
            })?;
        let chat_url = get("ENGRAM_CHAT_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar {
                name: "ENGRAM_CHAT_URL",
            })?;
        let embed_url = get("ENGRAM_EMBED_URL").unwrap_or_else(|| chat_url.clone());

        for (name, url) in [("ENGRAM_CHAT_URL", &chat_url), ("ENGRAM_EMBED_URL", &embed_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("expected an http(s) URL, got '{url}'"),
                });
            }
        }

        let embedding_dim = parse_or(
            get("ENGRAM_EMBED_DIM"),
            "ENGRAM_EMBED_DIM",
            EMBEDDING_DIM_DEFAULT,
        )?;
        if embedding_dim == 0 {
            return Err(ConfigError::InvalidValue {
                name: "ENGRAM_EMBED_DIM",
                reason: "dimension must be positive".into(),
            });
        }

        let temperature: f32 = parse_or(get("ENGRAM_TEMPERATURE"), "ENGRAM_TEMPERATURE", 0.7)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                name: "ENGRAM_TEMPERATURE",
                reason: format!("expected 0.0..=2.0, got {temperature}"),
            });
        }

        let workspace_root = match get("ENGRAM_WORKSPACE") {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_workspace_root(&get)?,
        };
        if !workspace_root.is_absolute() {
            return Err(ConfigError::InvalidValue {
                name: "ENGRAM_WORKSPACE",
                reason: format!(
                    "workspace root must be absolute, got '{}'",
                    workspace_root.display()
                ),
            });
        }

        Ok(Self {
            database_url,
            chat_url,
            embed_url,
            api_key: get("ENGRAM_API_KEY").filter(|v| !v.is_empty()),
            chat_model: get("ENGRAM_CHAT_MODEL").unwrap_or_else(|| "llama3.1:8b".into()),
            embed_model: get("ENGRAM_EMBED_MODEL").unwrap_or_else(|| "nomic-embed-text".into()),
            embedding_dim,
            workspace_root,
            temperature,
            ef_search: parse_or(get("ENGRAM_EF_SEARCH"), "ENGRAM_EF_SEARCH", EF_SEARCH_DEFAULT)?,
        })
    }
}

fn default_workspace_root(
    get: &impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    let home = get("HOME").ok_or(ConfigError::MissingVar {
        name: "ENGRAM_WORKSPACE",
    })?;
    Ok(PathBuf::from(home).join(".engram").join("workspaces"))
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) if raw.is_empty() => Ok(default),
        Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            name,
            reason: format!("{e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ENGRAM_DATABASE_URL", "postgresql://localhost/engram"),
            ("ENGRAM_CHAT_URL", "http://localhost:11434/v1"),
            ("HOME", "/home/todd"),
        ]
    }

    #[test]
    fn minimal_environment_loads_with_defaults() {
        let config = EngramConfig::load_from(source(&minimal())).unwrap();
        assert_eq!(config.embedding_dim, 768);
        assert_eq!(config.chat_model, "llama3.1:8b");
        assert_eq!(config.embed_model, "nomic-embed-text");
        assert_eq!(config.embed_url, "http://localhost:11434/v1");
        assert_eq!(config.ef_search, 64);
        assert_eq!(
            config.workspace_root,
            PathBuf::from("/home/todd/.engram/workspaces")
        );
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let err = EngramConfig::load_from(source(&[(
            "ENGRAM_CHAT_URL",
            "http://localhost:11434/v1",
        )]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar {
                name: "ENGRAM_DATABASE_URL"
            }
        ));
    }

    #[test]
    fn non_http_chat_url_rejected() {
        let mut vars = minimal();
        vars[1] = ("ENGRAM_CHAT_URL", "localhost:11434");
        assert!(EngramConfig::load_from(source(&vars)).is_err());
    }

    #[test]
    fn invalid_dimension_rejected() {
        let mut vars = minimal();
        vars.push(("ENGRAM_EMBED_DIM", "not-a-number"));
        assert!(EngramConfig::load_from(source(&vars)).is_err());

        let mut vars = minimal();
        vars.push(("ENGRAM_EMBED_DIM", "0"));
        assert!(EngramConfig::load_from(source(&vars)).is_err());
    }

    #[test]
    fn relative_workspace_rejected() {
        let mut vars = minimal();
        vars.push(("ENGRAM_WORKSPACE", "relative/path"));
        assert!(EngramConfig::load_from(source(&vars)).is_err());
    }

    #[test]
    fn overrides_are_honored() {
        let mut vars = minimal();
        vars.extend([
            ("ENGRAM_EMBED_DIM", "1024"),
            ("ENGRAM_CHAT_MODEL", "qwen2.5:14b"),
            ("ENGRAM_EMBED_URL", "http://embedder:8000/v1"),
            ("ENGRAM_WORKSPACE", "/srv/engram"),
        ]);
        let config = EngramConfig::load_from(source(&vars)).unwrap();
        assert_eq!(config.embedding_dim, 1024);
        assert_eq!(config.chat_model, "qwen2.5:14b");
        assert_eq!(config.embed_url, "http://embedder:8000/v1");
        assert_eq!(config.workspace_root, PathBuf::from("/srv/engram"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut vars = minimal();
        vars.push(("ENGRAM_API_KEY", "sk-secret"));
        let config = EngramConfig::load_from(source(&vars)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("postgresql://"));
        assert!(debug.contains("[REDACTED]"));
    }
}
