//! Centralized path resolution for pulumiservice
//!
//! # Environment Variables
//!
//! - `PULUMISERVICE_CONFIG_DIR` - Override config directory
//! - `PULUMI_HOME` - Pulumi's own home directory, where stored credentials live
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `PULUMISERVICE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/pulumiservice` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\pulumiservice`
//!    - macOS/Linux: `~/.config/pulumiservice`
//!
//! For credentials_file():
//! 1. `PULUMI_HOME/credentials.json`
//! 2. `~/.pulumi/credentials.json`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PULUMISERVICE_CONFIG_DIR";

/// Environment variable naming Pulumi's home directory
pub const ENV_PULUMI_HOME: &str = "PULUMI_HOME";

const APP_NAME: &str = "pulumiservice";

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get the pulumiservice config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_with(env_var)
}

fn config_dir_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Some(xdg_config) = env("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_NAME);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_NAME);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_NAME);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default location of the TOML config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Credentials written by `pulumi login`
pub fn credentials_file() -> Result<PathBuf> {
    credentials_file_with(env_var)
}

fn credentials_file_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let home = match env(ENV_PULUMI_HOME) {
        Some(dir) => expand(&dir),
        None => dirs::home_dir()
            .context("Could not determine home directory")?
            .join(".pulumi"),
    };
    Ok(home.join("credentials.json"))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_dir_env_override() {
        let result = config_dir_with(env_of(&[
            (ENV_CONFIG_DIR, "/custom/config/path"),
            ("XDG_CONFIG_HOME", "/tmp/xdg"),
        ]))
        .unwrap();
        assert_eq!(result, PathBuf::from("/custom/config/path"));
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let result = config_dir_with(env_of(&[(ENV_CONFIG_DIR, "~/dotfiles/pulumiservice")]))
            .unwrap();
        assert_eq!(result, home.join("dotfiles").join("pulumiservice"));
    }

    #[test]
    fn test_xdg_config_home() {
        let result = config_dir_with(env_of(&[("XDG_CONFIG_HOME", "/tmp/xdg-config-test")]))
            .unwrap();
        assert_eq!(result, PathBuf::from("/tmp/xdg-config-test/pulumiservice"));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_config_dir_unix() {
        let result = config_dir_with(env_of(&[])).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join(".config").join("pulumiservice"));
    }

    #[test]
    fn test_credentials_file() {
        let result = credentials_file_with(env_of(&[(ENV_PULUMI_HOME, "/opt/pulumi")])).unwrap();
        assert_eq!(result, PathBuf::from("/opt/pulumi/credentials.json"));

        let result = credentials_file_with(env_of(&[])).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join(".pulumi").join("credentials.json"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
