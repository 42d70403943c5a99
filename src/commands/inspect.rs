//! Read-only helpers: supported types, id decoding and resolved settings

use anyhow::{Result, bail};
use colored::Colorize;
use std::collections::BTreeMap;

use reconcile::decode_any;

use crate::Context;
use crate::config::Settings;
use crate::resources;
use crate::ui;

/// List every type token with its accepted id shapes
pub fn types(ctx: &Context) -> Result<()> {
    for (token, layouts) in resources::ID_LAYOUTS {
        if ctx.quiet {
            println!("{token}");
            continue;
        }
        let shapes: Vec<_> = layouts.iter().map(|l| l.format()).collect();
        println!("{}  {}", token.bold(), shapes.join(" | ").dimmed());
    }
    Ok(())
}

/// Decode `id` against the layouts of `type_token`
pub fn decode_id(type_token: &str, id: &str) -> Result<()> {
    let fields = decoded_fields(type_token, id)?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn decoded_fields(type_token: &str, id: &str) -> Result<BTreeMap<&'static str, String>> {
    let Some(layouts) = resources::id_layouts(type_token) else {
        bail!("unknown resource type {type_token:?}");
    };
    let (which, values) = decode_any(layouts, id)?;
    if which > 0 {
        log::info!("{id} uses an older id layout: {}", layouts[which].format());
    }
    Ok(layouts[which].field_names().into_iter().zip(values).collect())
}

/// Show where each setting came from, without revealing the token
pub fn config(ctx: &Context) -> Result<()> {
    let settings = Settings::resolve(&ctx.service)?;
    ui::header("Configuration");
    ui::kv("service url", &settings.service_url);
    ui::kv("access token", &settings.token_source.to_string());
    ui::kv("timeout", &format!("{}s", settings.timeout.as_secs()));
    match &settings.config_file {
        Some(path) => ui::kv("config file", &path.display().to_string()),
        None => ui::dim("no config file"),
    }
    Ok(())
}
