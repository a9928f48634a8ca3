// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Deploy command - publishes the catalog to the Netlify site

use super::{print_json, Ctx, Style};
use wreathkeeper::deploy::{self, DeployEvent, DeployOutcome, Deployer, PayloadEncoding};
use anyhow::{bail, Result};
use serde_json::json;
use tracing::warn;

/// Run the deploy command. Ctrl-C cancels a running deploy.
pub fn run(ctx: &Ctx, check: bool, raw: bool) -> Result<()> {
    let settings = ctx.settings();
    let payload = if raw { PayloadEncoding::Raw } else { PayloadEncoding::Base64 };
    let deployer = Deployer::from_settings(&settings, payload)?;

    if check {
        let site = deployer.check_site()?;
        if ctx.json {
            return print_json(&json!({ "name": site.name, "url": site.url }));
        }
        println!("Site {} ({}) is reachable and the token works", site.name, site.url);
        return Ok(());
    }

    // Publishing an empty list over the live site is never what was meant
    let catalog = ctx.catalog_for_update(&settings)?;
    let handle = deploy::spawn(deployer, catalog.wreaths().to_vec());

    let token = handle.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!("Ctrl-C will not cancel this deploy: {}", e);
    }

    for event in handle.events() {
        if !ctx.json {
            print_event(ctx, &event);
        }
    }

    finish(ctx, handle.wait(), settings.deploy_max_wait_secs)
}

/// Report the terminal outcome. Only a failed deploy is an error; a timed-out
/// deploy may still go live and a cancelled one was asked for.
fn finish(ctx: &Ctx, outcome: DeployOutcome, max_wait_secs: u64) -> Result<()> {
    if let Some(notice) = pending_notice(&outcome, max_wait_secs) {
        if ctx.json {
            return print_json(&match &outcome {
                DeployOutcome::TimedOut { deploy_id } => json!({ "status": "timed_out", "deploy_id": deploy_id }),
                _ => json!({ "status": "cancelled" }),
            });
        }
        println!("{}", ctx.paint(&notice, Style::Warn));
        return Ok(());
    }

    match outcome {
        DeployOutcome::Succeeded(summary) => {
            if ctx.json {
                return print_json(&json!({
                    "status": "succeeded",
                    "deploy_id": summary.deploy_id,
                    "site": summary.site_name,
                    "url": summary.url,
                    "records": summary.records,
                }));
            }
            println!(
                "{} {} wreaths published to {}",
                ctx.paint("Deployed.", Style::Ok),
                summary.records,
                summary.url
            );
            Ok(())
        }
        DeployOutcome::Failed(failure) => bail!("Deploy failed: {failure}"),
        DeployOutcome::TimedOut { .. } | DeployOutcome::Cancelled => Ok(()),
    }
}

/// Notice for outcomes that end the run without publishing or failing
fn pending_notice(outcome: &DeployOutcome, max_wait_secs: u64) -> Option<String> {
    match outcome {
        DeployOutcome::TimedOut { deploy_id } => Some(format!(
            "Deploy {deploy_id} was not ready after {max_wait_secs} seconds. It may still finish; check the Netlify dashboard."
        )),
        DeployOutcome::Cancelled => Some("Deploy cancelled.".to_string()),
        DeployOutcome::Succeeded(_) | DeployOutcome::Failed(_) => None,
    }
}

fn print_event(ctx: &Ctx, event: &DeployEvent) {
    match event {
        DeployEvent::Stage(stage) => println!("{}...", stage),
        DeployEvent::Prepared { records, bytes } => {
            println!("  {records} wreaths, {bytes} bytes");
        }
        DeployEvent::SiteVerified(site) => println!("  site: {} {}", site.name, ctx.paint(&site.url, Style::Dim)),
        DeployEvent::LiveDeploy { id } => println!("  current deploy: {id}"),
        DeployEvent::DeployCreated { id, url } => {
            println!("  deploy {id} created");
            if let Some(url) = url {
                println!("  preview: {url}");
            }
        }
        DeployEvent::Polled { state } => println!("  state: {state}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wreathkeeper::deploy::DeployFailure;
    use wreathkeeper::project::Project;
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> Ctx {
        Ctx {
            project: Project::new(dir.path()),
            json: false,
            color: false,
        }
    }

    #[test]
    fn test_timed_out_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let outcome = DeployOutcome::TimedOut { deploy_id: "d-42".into() };

        let notice = pending_notice(&outcome, 300).unwrap();
        assert!(notice.contains("d-42"));
        assert!(notice.contains("300 seconds"));
        assert!(finish(&ctx(&dir), outcome, 300).is_ok());
    }

    #[test]
    fn test_cancelled_is_not_an_error() {
        let dir = TempDir::new().unwrap();

        assert_eq!(pending_notice(&DeployOutcome::Cancelled, 300).as_deref(), Some("Deploy cancelled."));
        assert!(finish(&ctx(&dir), DeployOutcome::Cancelled, 300).is_ok());
    }

    #[test]
    fn test_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let outcome = DeployOutcome::Failed(DeployFailure::MissingCredentials);

        assert!(pending_notice(&outcome, 300).is_none());
        let err = finish(&ctx(&dir), outcome, 300).unwrap_err();
        assert!(err.to_string().starts_with("Deploy failed"));
    }
}
