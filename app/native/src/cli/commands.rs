//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments.

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};
use colored::Colorize;
use serde::Serialize;

use super::{daemon, output};
use crate::config::{self, SysbarsConfig};
use crate::error::SysbarsError;
use crate::insets::{BarVisibility, DisplayId, InsetTypes};
use crate::policy::FilterPolicyStore;
use crate::schema;
use crate::settings::{FileSettings, SYSTEM_BAR_VISIBILITY_OVERRIDE, SettingsSource};

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sysbars CLI - per-display system bar visibility policy.
#[derive(Parser, Debug)]
#[command(name = "sysbars")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use this configuration file instead of the default search paths.
    #[arg(long, short, global = true, value_name = "PATH", env = "SYSBARS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Evaluate which bars a package would get.
    ///
    /// Reads the policy from `--policy` or, when omitted, from the settings
    /// file named in the configuration.
    #[command(after_help = r#"Examples:
  sysbars eval --package com.video --policy immersive.full=com.video
  sysbars eval --package com.maps --requested status,navigation
  sysbars eval --package com.video --json"#)]
    Eval {
        /// Package name of the focused application.
        #[arg(long, short)]
        package: String,

        /// Bars the window asks for (comma separated: status, navigation, all, none).
        #[arg(long, short, default_value = "none", value_parser = parse_types)]
        requested: InsetTypes,

        /// Policy string to evaluate instead of the settings file.
        #[arg(long)]
        policy: Option<String>,

        /// Output as JSON.
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Show the parsed bar policy.
    Policy {
        /// Policy string to parse instead of the settings file.
        #[arg(long)]
        policy: Option<String>,

        /// Output as JSON.
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Run the policy daemon, reading window events from stdin.
    ///
    /// Each line is one event, for example `focus 1 com.video status`.
    /// Type `status` to print every display and `quit` to stop.
    Run {
        /// Displays to register at startup.
        #[arg(long = "display", short = 'd', value_name = "ID")]
        displays: Vec<DisplayId>,

        /// Print `status` output as JSON.
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Output sysbars configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// sysbars configuration file. Can be redirected to a file for use with
    /// editors that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(sysbars completions --shell zsh)"
    ///   sysbars completions --shell fish > ~/.config/fish/completions/sysbars.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

fn parse_types(value: &str) -> Result<InsetTypes, String> {
    InsetTypes::parse_list(value).map_err(|bad| format!("unknown inset type '{bad}'"))
}

/// Result of `sysbars eval --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Evaluation<'a> {
    package: &'a str,
    requested: String,
    policy: Option<&'a str>,
    show: String,
    hide: String,
}

impl Evaluation<'_> {
    fn new<'a>(
        package: &'a str,
        requested: InsetTypes,
        store: &'a FilterPolicyStore,
        visibility: BarVisibility,
    ) -> Evaluation<'a> {
        Evaluation {
            package,
            requested: requested.to_string(),
            policy: store.setting_value(),
            show: visibility.show.to_string(),
            hide: visibility.hide.to_string(),
        }
    }
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self, config: &SysbarsConfig) -> Result<(), SysbarsError> {
        match &self.command {
            Commands::Eval { package, requested, policy, json } => {
                let store = load_store(config, policy.as_deref())?;
                let visibility = store.compute_visibility(package, *requested);
                if *json {
                    let evaluation = Evaluation::new(package, *requested, &store, visibility);
                    output::print_highlighted_json(&serde_json::to_value(&evaluation)?);
                } else {
                    println!("{} {}", package.bold(), output::format_visibility(visibility));
                }
            }

            Commands::Policy { policy, json } => {
                let store = load_store(config, policy.as_deref())?;
                if *json {
                    output::print_highlighted_json(&serde_json::to_value(store.snapshot())?);
                } else {
                    let value = store.setting_value().unwrap_or("<unset>");
                    println!("{} {}", "policy:".dimmed(), value.cyan());
                    println!("{}", output::policy_table(&store));
                }
            }

            Commands::Run { displays, json } => {
                let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
                runtime.block_on(daemon::run(config, displays, *json))?;
            }

            Commands::Schema => {
                let schema_output = schema::print_schema();
                println!("{schema_output}");
            }

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
            }
        }

        Ok(())
    }

    /// Whether this invocation runs the long-lived daemon.
    #[must_use]
    pub const fn is_daemon(&self) -> bool { matches!(self.command, Commands::Run { .. }) }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "sysbars", &mut io::stdout());
    }
}

/// Builds a policy store from `policy`, or from the configured settings file.
fn load_store(config: &SysbarsConfig, policy: Option<&str>) -> Result<FilterPolicyStore, SysbarsError> {
    let value = match policy {
        Some(policy) => Some(policy.to_string()),
        None => {
            let settings = FileSettings::new(config.settings_path());
            tracing::debug!(path = %settings.path().display(), "reading bar policy");
            settings.read(SYSTEM_BAR_VISIBILITY_OVERRIDE)?
        }
    };

    let mut store = FilterPolicyStore::new();
    store.reload(value.as_deref());
    Ok(store)
}

/// Applies the global `--config` flag before configuration is loaded.
pub(super) fn apply_config_flag(cli: &Cli) {
    if let Some(path) = &cli.config {
        if !config::set_custom_config_path(path.clone()) {
            tracing::debug!(path = %path.display(), "configuration path already set");
        }
    }
}
