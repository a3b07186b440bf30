//! `conformance` command line
//!
//! Drives the engine against an Azure DevOps organisation from a terminal.
//! Argument parsing and command execution live here so they can be tested
//! against in-memory doubles; `main.rs` only wires the REST client.

#![warn(unreachable_pub)]

mod render;

use anyhow::Context;
use cc_core::{Banner, ConformanceServices, SortColumn, SortOrder};
use cc_gateway::StaticHost;
use cc_model::{validate_new_name, Settings, WorkItemId};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

pub use render::render_table;

/// Continuous Conformance for Azure DevOps work items
#[derive(Debug, Parser)]
#[command(name = "conformance", version, about)]
pub struct Cli {
    /// Connection configuration file
    #[arg(short, long, default_value = "conformance.yaml", env = "CONFORMANCE_CONFIG")]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or change the project's measure catalogue
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// List the project's work-item types
    Types,

    /// Show the conformance table of a work item
    Status {
        /// Parent work-item id
        parent: WorkItemId,
        /// Column to sort by
        #[arg(long)]
        sort: Option<SortColumn>,
        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Create work items for measures under a parent
    Create {
        /// Parent work-item id
        parent: WorkItemId,
        /// Measure name; repeat for several
        #[arg(long = "measure", short, required = true)]
        measures: Vec<String>,
    },

    /// Check a candidate measure name against the catalogue
    CheckName {
        /// Candidate name
        name: String,
    },
}

/// `settings` subcommands
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print the active settings as JSON
    Show,
    /// Store a settings JSON document, overwriting the current one
    Save {
        /// JSON file to store
        file: PathBuf,
    },
    /// Restore the built-in catalogue
    Reset,
}

/// Execute `command`, writing results to `out`.
///
/// `host` is the host the services were built over; commands that work on a
/// parent open it there first.
///
/// # Errors
/// Backend, validation or I/O failures.
pub async fn run(
    command: Command,
    services: &ConformanceServices,
    host: &StaticHost,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Command::Settings(SettingsCommand::Show) => {
            let settings = services.store.get_settings().await;
            writeln!(out, "{}", serde_json::to_string_pretty(&settings)?)?;
        }
        Command::Settings(SettingsCommand::Save { file }) => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let document: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            let settings = Settings::from_document(document)?;
            settings
                .validate()
                .with_context(|| format!("{} is not a valid catalogue", file.display()))?;
            match services.store.store_settings(&settings).await {
                Ok(stored) => {
                    services.notifier.notify(Banner::settings_saved());
                    writeln!(
                        out,
                        "Stored {} measures (etag {}).",
                        stored.available_measures.len(),
                        stored.etag.as_deref().unwrap_or("-")
                    )?;
                }
                Err(err) => {
                    services.notifier.notify(Banner::settings_save_failed(&err));
                    return Err(err.into());
                }
            }
        }
        Command::Settings(SettingsCommand::Reset) => {
            let defaults = services.store.restore_default().await;
            services.store.settle().await;
            writeln!(
                out,
                "Restored {} default measures.",
                defaults.available_measures.len()
            )?;
        }
        Command::Types => {
            let editor = services.settings_editor().await;
            let options = editor.load_type_options().await?;
            for (i, name) in options.names.iter().enumerate() {
                let mut marks = Vec::new();
                if options.selected_work_item_type == Some(i) {
                    marks.push("measures");
                }
                if options.selected_aggregation_type == Some(i) {
                    marks.push("aggregator");
                }
                if marks.is_empty() {
                    writeln!(out, "{name}")?;
                } else {
                    writeln!(out, "{name} ({})", marks.join(", "))?;
                }
            }
        }
        Command::Status { parent, sort, desc } => {
            host.set_current(parent, None);
            let page = services.work_item_page();
            page.load().await?;
            if let Some(column) = sort {
                let order = if desc { SortOrder::Descending } else { SortOrder::Ascending };
                page.sort(column, order);
            }
            let tag = page.conformance_tag().unwrap_or_default();
            write!(out, "{}", render_table(&page.entries(), &tag))?;
        }
        Command::Create { parent, measures } => {
            host.set_current(parent, None);
            let page = services.work_item_page();
            page.load().await?;
            for name in &measures {
                page.select(name)
                    .with_context(|| format!("measure {name:?} cannot be selected"))?;
            }
            let outcome = page.create_selected().await?;
            writeln!(
                out,
                "Created {}, adopted {} work item(s).",
                outcome.created.len(),
                outcome.adopted.len()
            )?;
            let tag = page.conformance_tag().unwrap_or_default();
            write!(out, "{}", render_table(&page.entries(), &tag))?;
        }
        Command::CheckName { name } => {
            let settings = services.store.get_settings().await;
            validate_new_name(&name, &settings.available_measures)?;
            writeln!(out, "{name:?} is a valid measure name.")?;
        }
    }
    Ok(())
}
