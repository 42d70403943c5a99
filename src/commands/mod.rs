//! Subcommand implementations

pub mod batch;
pub mod inspect;
pub mod lifecycle;

use anyhow::{Context as _, Result};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use cloudapi::Client;
use reconcile::Registry;

use crate::config::Settings;
use crate::resources;

/// Read a whole document from `path`, or stdin when absent or "-"
pub(crate) fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Could not read request from stdin")?;
            Ok(buf)
        }
    }
}

/// Registry of every kind, talking to the configured service
///
/// Local operations (check, diff) never call out, so they run without a token.
pub(crate) fn connect(settings: &Settings, needs_token: bool) -> Result<Registry> {
    let token = if needs_token {
        settings.require_token()?
    } else {
        settings.access_token.as_deref().unwrap_or_default()
    };
    log::debug!(
        "Using {} (token from {})",
        settings.service_url,
        settings.token_source
    );
    let client = Arc::new(Client::http(&settings.service_url, token, settings.timeout));
    Ok(resources::registry(&client))
}
