// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Settings command - shows and changes `settings.json`

use super::{print_json, Ctx};
use wreathkeeper::config;
use anyhow::Result;
use clap::Subcommand;
use serde_json::{Map, Value};

/// Settings actions
#[derive(Debug, Clone, Subcommand)]
pub enum SettingsAction {
    /// Show effective settings (token masked)
    Show,
    /// Print one setting
    Get {
        /// Setting name
        key: String,
    },
    /// Change one setting in settings.json
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
}

/// Run the settings command
pub fn run(ctx: &Ctx, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = ctx.settings();
            let shown = settings.masked();
            if ctx.json {
                let map: Map<String, Value> = shown.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
                return print_json(&map);
            }
            for (key, value) in shown {
                println!("{key} = {}", display(&value));
            }
        }
        SettingsAction::Get { key } => {
            let value = if key == "netlify_access_token" {
                ctx.settings()
                    .masked()
                    .into_iter()
                    .find_map(|(k, v)| (k == key).then_some(v))
                    .unwrap_or(Value::Null)
            } else {
                ctx.settings().get(&key)?
            };
            println!("{}", display(&value));
        }
        SettingsAction::Set { key, value } => {
            // Only the file layer is written; environment overrides stay out of it
            let (mut settings, warning) = config::load_file(&ctx.project);
            if let Some(w) = warning {
                eprintln!("Warning: {w}");
            }
            settings.set(&key, &value)?;
            config::save(&ctx.project, &settings)?;
            println!("Set {key}");
        }
    }
    Ok(())
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
