// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Wreathkeeper CLI - inventory catalog and website deploy for a wreath shop

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use wreathkeeper::project::Project;

mod commands;

use commands::{images::ImagesAction, list::ListArgs, settings::SettingsAction, Ctx, WreathFields};

#[derive(Parser)]
#[command(name = "wreathkeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project folder (defaults to the remembered one, then the current directory)
    #[arg(short, long, env = "WREATHKEEPER_PROJECT", global = true)]
    project: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true, value_parser = clap::builder::FalseyValueParser::new())]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the project folder layout and an empty catalog
    Init {
        /// Remember this folder for later runs
        #[arg(long)]
        remember: bool,
    },

    /// Show the project folder, or switch to another one
    Project {
        /// Folder to use from now on
        path: Option<PathBuf>,
    },

    /// List wreaths
    List(ListArgs),

    /// Show one wreath
    Show {
        /// Wreath id (or unique prefix)
        id: String,
    },

    /// Add a wreath
    Add(WreathFields),

    /// Change fields of a wreath
    Edit {
        /// Wreath id (or unique prefix)
        id: String,

        #[command(flatten)]
        fields: WreathFields,
    },

    /// Delete a wreath
    Delete {
        /// Wreath id (or unique prefix)
        id: String,
    },

    /// Import wreaths from JSON files (default: everything in imports/)
    Import {
        /// Files to import
        paths: Vec<PathBuf>,
    },

    /// Export the catalog to a JSON file
    Export {
        /// Output file ("-" for stdout; default: exports/)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Back up the catalog now, or list backups
    Backup {
        /// List existing backups instead
        #[arg(long)]
        list: bool,
    },

    /// Publish the catalog to the Netlify site
    Deploy {
        /// Only verify the site and token
        #[arg(long)]
        check: bool,

        /// Send the file as plain text instead of base64
        #[arg(long)]
        raw: bool,
    },

    /// Manage a wreath's images
    Images {
        #[command(subcommand)]
        action: ImagesAction,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        return commands::completions::run(shell, &mut Cli::command());
    }

    let ctx = Ctx {
        project: Project::resolve(cli.project)?,
        json: cli.json,
        color: !cli.no_color,
    };

    // Execute command
    match cli.command {
        Commands::Init { remember } => commands::init::run(&ctx, remember),
        Commands::Project { path } => commands::project::run(&ctx, path),
        Commands::List(args) => commands::list::run(&ctx, &args),
        Commands::Show { id } => commands::show::run(&ctx, &id),
        Commands::Add(fields) => commands::add::run(&ctx, fields),
        Commands::Edit { id, fields } => commands::edit::run(&ctx, &id, fields),
        Commands::Delete { id } => commands::delete::run(&ctx, &id),
        Commands::Import { paths } => commands::import::run(&ctx, paths),
        Commands::Export { output } => commands::export::run(&ctx, output),
        Commands::Backup { list } => commands::backup::run(&ctx, list),
        Commands::Deploy { check, raw } => commands::deploy::run(&ctx, check, raw),
        Commands::Images { action } => commands::images::run(&ctx, action),
        Commands::Settings { action } => commands::settings::run(&ctx, action),
        Commands::Completions { .. } => Ok(()),
    }
}
