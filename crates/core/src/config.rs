use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: "0.0.0.0:5000".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            request_timeout_secs: 170,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SheetsSettings {
    /// A fixed OAuth access token. Takes precedence over the connector.
    pub access_token: Option<String>,
    pub connector_host: Option<String>,
    /// Full header value, e.g. `repl <identity>`.
    pub connector_identity: Option<String>,
    pub api_base: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            connector_host: None,
            connector_identity: None,
            api_base: "https://sheets.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    pub server_url: String,
    pub image_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            image_timeout_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub extraction: ExtractionSettings,
    pub sheets: SheetsSettings,
    pub client: ClientSettings,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Resolve the config file (explicit path, `KHATT_CONFIG`, then
    /// `khatt.toml` in the platform config dir), load it and overlay the
    /// environment.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("KHATT_CONFIG").map(PathBuf::from))
            .or_else(default_config_path);
        let mut config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// Overlay values from `lookup`, which maps an environment variable name
    /// to its value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("KHATT_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            self.extraction.api_key = Some(v);
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            self.extraction.model = v;
        }
        if let Some(v) = lookup("GOOGLE_SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = Some(v);
        }
        if let Some(v) = lookup("REPLIT_CONNECTORS_HOSTNAME") {
            self.sheets.connector_host = Some(v);
        }
        if let Some(v) = lookup("REPL_IDENTITY") {
            self.sheets.connector_identity = Some(format!("repl {v}"));
        } else if let Some(v) = lookup("WEB_REPL_RENEWAL") {
            self.sheets.connector_identity = Some(format!("depl {v}"));
        }
        if let Some(v) = lookup("KHATT_SERVER_URL") {
            self.client.server_url = v;
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "khatt", "Khatt")
        .map(|dirs| dirs.config_dir().join("khatt.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.client.image_timeout_secs, 180);
        assert_eq!(cfg.extraction.model, "gemini-1.5-flash");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = Config::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:8080"

            [client]
            image_timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.client.image_timeout_secs, 60);
        assert_eq!(cfg.client.server_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(Config::from_toml("[server"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "k-123"),
            ("KHATT_SERVER_URL", "http://example:9000"),
            ("WEB_REPL_RENEWAL", "tok"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.extraction.api_key.as_deref(), Some("k-123"));
        assert_eq!(cfg.client.server_url, "http://example:9000");
        assert_eq!(cfg.sheets.connector_identity.as_deref(), Some("depl tok"));
    }

    #[test]
    fn repl_identity_wins_over_renewal() {
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| match k {
            "REPL_IDENTITY" => Some("a".into()),
            "WEB_REPL_RENEWAL" => Some("b".into()),
            _ => None,
        });
        assert_eq!(cfg.sheets.connector_identity.as_deref(), Some("repl a"));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("khatt.toml");
        std::fs::write(&path, "[extraction]\nmodel = \"gemini-2.0-flash\"\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.extraction.model, "gemini-2.0-flash");
    }
}
