//! Provider settings
//!
//! Each setting resolves from the command line (or its environment
//! variable), then the TOML config file, then a default. The access token
//! additionally falls back to the credentials stored by `pulumi login`.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::ServiceArgs;
use crate::paths;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Config File
// ============================================================================

/// Contents of `config.toml`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub service_url: Option<String>,
    pub access_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }
}

// ============================================================================
// Stored Credentials
// ============================================================================

/// `~/.pulumi/credentials.json` as written by `pulumi login`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Credentials {
    current: Option<String>,
    access_tokens: BTreeMap<String, String>,
}

impl Credentials {
    fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let creds = serde_json::from_str(&content)
            .with_context(|| format!("Invalid credentials in {}", path.display()))?;
        Ok(Some(creds))
    }

    /// Token stored for `service_url`, else the one for the current login
    fn token_for(&self, service_url: &str) -> Option<&str> {
        let wanted = service_url.trim_end_matches('/');
        self.access_tokens
            .iter()
            .find(|(url, _)| url.trim_end_matches('/') == wanted)
            .or_else(|| {
                let current = self.current.as_deref()?;
                self.access_tokens.get_key_value(current)
            })
            .map(|(_, token)| token.as_str())
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    CommandLine,
    ConfigFile,
    Credentials,
    Missing,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CommandLine => "command line",
            Self::ConfigFile => "config file",
            Self::Credentials => "stored credentials",
            Self::Missing => "not set",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub service_url: String,
    pub access_token: Option<String>,
    pub token_source: TokenSource,
    pub timeout: Duration,
    /// Config file that was read, if any
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from arguments, config file and stored credentials
    pub fn resolve(args: &ServiceArgs) -> Result<Self> {
        let (config_path, explicit) = match &args.config {
            Some(path) => (paths::expand(&path.to_string_lossy()), true),
            None => (paths::config_file()?, false),
        };
        Self::resolve_from(args, &config_path, explicit, &paths::credentials_file()?)
    }

    fn resolve_from(
        args: &ServiceArgs,
        config_path: &Path,
        explicit: bool,
        credentials_path: &Path,
    ) -> Result<Self> {
        let (file, config_file) = if explicit || config_path.exists() {
            log::debug!("Loading config from {}", config_path.display());
            (FileConfig::load(config_path)?, Some(config_path.to_path_buf()))
        } else {
            (FileConfig::default(), None)
        };

        let service_url = args
            .service_url
            .clone()
            .or_else(|| file.service_url.clone())
            .unwrap_or_else(|| cloudapi::DEFAULT_SERVICE_URL.to_string());

        let timeout = Duration::from_secs(
            args.timeout
                .or(file.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        let from_args = non_empty(args.access_token.as_ref());
        let from_file = non_empty(file.access_token.as_ref());
        let (access_token, token_source) = if let Some(token) = from_args {
            (Some(token), TokenSource::CommandLine)
        } else if let Some(token) = from_file {
            (Some(token), TokenSource::ConfigFile)
        } else if let Some(token) = Credentials::load(credentials_path)?
            .as_ref()
            .and_then(|creds| creds.token_for(&service_url))
        {
            log::debug!("Using stored credentials from {}", credentials_path.display());
            (Some(token.to_string()), TokenSource::Credentials)
        } else {
            (None, TokenSource::Missing)
        };

        Ok(Self {
            service_url,
            access_token,
            token_source,
            timeout,
            config_file,
        })
    }

    pub fn require_token(&self) -> Result<&str> {
        match self.access_token.as_deref() {
            Some(token) => Ok(token),
            None => bail!("pulumi access token not found"),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> ServiceArgs {
        ServiceArgs::default()
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::resolve_from(
            &args(),
            &dir.path().join("config.toml"),
            false,
            &dir.path().join("credentials.json"),
        )
        .unwrap();
        assert_eq!(settings.service_url, "https://api.pulumi.com");
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.token_source, TokenSource::Missing);
        assert!(settings.config_file.is_none());

        let err = settings.require_token().unwrap_err();
        assert_eq!(err.to_string(), "pulumi access token not found");
    }

    #[test]
    fn test_command_line_beats_config_file() {
        let dir = TempDir::new().unwrap();
        let config = write(
            &dir,
            "config.toml",
            "service_url = \"https://pulumi.example.com\"\naccess_token = \"pul-file\"\ntimeout_secs = 5\n",
        );
        let creds = dir.path().join("credentials.json");

        let settings = Settings::resolve_from(&args(), &config, false, &creds).unwrap();
        assert_eq!(settings.service_url, "https://pulumi.example.com");
        assert_eq!(settings.access_token.as_deref(), Some("pul-file"));
        assert_eq!(settings.token_source, TokenSource::ConfigFile);
        assert_eq!(settings.timeout, Duration::from_secs(5));

        let flags = ServiceArgs {
            access_token: Some("pul-flag".into()),
            timeout: Some(120),
            ..args()
        };
        let settings = Settings::resolve_from(&flags, &config, false, &creds).unwrap();
        assert_eq!(settings.require_token().unwrap(), "pul-flag");
        assert_eq!(settings.token_source, TokenSource::CommandLine);
        assert_eq!(settings.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_stored_credentials() {
        let dir = TempDir::new().unwrap();
        let creds = write(
            &dir,
            "credentials.json",
            r#"{
                "current": "https://api.pulumi.com",
                "accessTokens": {
                    "https://api.pulumi.com": "pul-cloud",
                    "https://pulumi.example.com/": "pul-self-hosted"
                }
            }"#,
        );
        let config = dir.path().join("config.toml");

        let settings = Settings::resolve_from(&args(), &config, false, &creds).unwrap();
        assert_eq!(settings.access_token.as_deref(), Some("pul-cloud"));
        assert_eq!(settings.token_source, TokenSource::Credentials);

        let self_hosted = ServiceArgs {
            service_url: Some("https://pulumi.example.com".into()),
            ..args()
        };
        let settings = Settings::resolve_from(&self_hosted, &config, false, &creds).unwrap();
        assert_eq!(settings.access_token.as_deref(), Some("pul-self-hosted"));

        let unknown = ServiceArgs {
            service_url: Some("https://other.example.com".into()),
            ..args()
        };
        let settings = Settings::resolve_from(&unknown, &config, false, &creds).unwrap();
        assert_eq!(settings.access_token.as_deref(), Some("pul-cloud"));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let result =
            Settings::resolve_from(&args(), &missing, true, &dir.path().join("creds.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "config.toml", "timeout = \"soon\"\n");
        let result =
            Settings::resolve_from(&args(), &config, false, &dir.path().join("creds.json"));
        assert!(result.is_err());
    }
}
