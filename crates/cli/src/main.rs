// examdesk CLI - exam record operations against the records API

mod exit_codes;
mod export;
mod history;
mod prompt;
mod records;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use examdesk_config::{Settings, API_URL_ENV};
use examdesk_gateway::{CleanSource, GatewayClient, GatewayError, GatewayOptions};
use examdesk_wizard::{WizardError, WizardKind};

use exit_codes::{gateway_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "examdesk")]
#[command(about = "Create, read, update and delete exam records; review the audit log")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Records API base URL [env: EXAMDESK_API_URL] [default: from settings]
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add records, one prompt per field
    #[command(after_help = "\
Examples:
  examdesk create --count 2
  examdesk create --input new_students.json")]
    Create {
        /// Number of records (asked for when omitted)
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// JSON array of records instead of prompting
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
    },

    /// Delete records by SBD and Year
    #[command(after_help = "\
Examples:
  examdesk delete --count 1
  examdesk delete --input keys.json --yes")]
    Delete {
        /// Number of records (asked for when omitted)
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// JSON array of {\"SBD\", \"Year\"} objects instead of prompting
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show the records for an SBD (exit 3 if none)
    Read {
        sbd: String,

        /// Only this exam year
        #[arg(long)]
        year: Option<String>,

        /// JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Change columns of one record
    #[command(after_help = "\
Subject scores must be numbers; an empty value clears the score.

Examples:
  examdesk update 1001 2019 --set Toán=9.5 --set Văn=
  examdesk update 1001 2019 --set MaTinh=02 --json")]
    Update {
        sbd: String,
        year: String,

        /// Column assignment, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,

        /// Print the body that was sent
        #[arg(long)]
        json: bool,
    },

    /// List the audit log, newest first
    History {
        #[command(subcommand)]
        command: Option<history::HistoryCommands>,

        /// JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Download the updated dataset (Updated_Data.csv)
    Save {
        /// Target directory [default: settings download_dir, else .]
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Clean a dataset on the server and download Cleaned_Data.csv
    Clean {
        /// 1 = updated data, 2 = raw data
        source: CleanSource,

        /// Target directory [default: settings download_dir, else .]
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// List province codes
    Provinces {
        #[arg(long)]
        json: bool,
    },

    /// Print chart data as JSON
    Chart {
        kind: export::ChartArg,

        /// Subject column (histogram)
        #[arg(long)]
        subject: Option<String>,

        /// Exam year (histogram, heatmap)
        #[arg(long)]
        year: Option<String>,
    },

    /// Show the settings file and the effective settings
    Config {
        /// Write the effective settings to the settings file
        #[arg(long)]
        init: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::load().with_env_overrides();
    if let Some(base) = cli.api_base {
        settings.api_base = base;
    }
    if let Some(secs) = cli.timeout {
        settings.timeout_secs = secs;
    }

    let result = run(cli.command, &settings);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands, settings: &Settings) -> Result<(), CliError> {
    if let Commands::Config { init } = command {
        return cmd_config(settings, init);
    }

    let client = connect(settings)?;
    let out_dir = |out: Option<PathBuf>| {
        out.or_else(|| settings.download_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    };

    match command {
        Commands::Create { count, input } => {
            records::cmd_batch(&client, WizardKind::Create, count, input.as_deref(), true)
        }
        Commands::Delete { count, input, yes } => records::cmd_batch(
            &client,
            WizardKind::Delete,
            count,
            input.as_deref(),
            yes || !settings.confirm_destructive,
        ),
        Commands::Read { sbd, year, json } => records::cmd_read(&client, &sbd, year.as_deref(), json),
        Commands::Update { sbd, year, set, json } => {
            records::cmd_update(&client, &sbd, &year, &set, json)
        }
        Commands::History { command, json } => {
            history::cmd_history(&client, command, json, !settings.confirm_destructive)
        }
        Commands::Save { out } => export::cmd_save(&client, &out_dir(out)),
        Commands::Clean { source, out } => export::cmd_clean(&client, source, &out_dir(out)),
        Commands::Provinces { json } => export::cmd_provinces(&client, json),
        Commands::Chart { kind, subject, year } => export::cmd_chart(&client, kind, subject, year),
        Commands::Config { .. } => Ok(()),
    }
}

fn connect(settings: &Settings) -> Result<GatewayClient, CliError> {
    GatewayClient::new(GatewayOptions {
        api_base: settings.api_base.clone(),
        timeout: settings.timeout(),
    })
    .map_err(|e| {
        CliError::gateway(e).with_hint(format!("set --api-base or {API_URL_ENV}"))
    })
}

fn cmd_config(settings: &Settings, init: bool) -> Result<(), CliError> {
    if init {
        let path = settings
            .save()
            .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
        eprintln!("wrote {}", path.display());
    }
    println!("# {}", Settings::config_path_display());
    let body = serde_json::to_string_pretty(settings).map_err(|e| CliError::io(e.to_string()))?;
    println!("{body}");
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from gateway error with proper exit code.
    pub fn gateway(err: GatewayError) -> Self {
        let code = gateway_exit_code(&err);
        let hint = match &err {
            GatewayError::Network(_) => Some(format!(
                "is the records API running? set --api-base or {API_URL_ENV}"
            )),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn wizard(err: WizardError) -> Self {
        match err {
            WizardError::Gateway(e) => Self::gateway(e),
            WizardError::Commit(c) => Self::gateway(c.error),
            other => Self { code: EXIT_USAGE, message: other.to_string(), hint: None },
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
