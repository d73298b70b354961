// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `omp` subcommands
//! are contained in modules.
//!
//! Only 3 things should be public in this module: `Omp`, `Omp::run`, and
//! `OmpError`.

mod common;
mod error;
mod ledger_summary;
mod msb_consolidate;
mod query_sql;

pub use error::OmpError;

use std::path::PathBuf;

use clap::{AppSettings, Args, Parser, Subcommand};
use log::info;

use common::{display_warnings, CONFIG_HELP};

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Observation management tools: archive query translation, MSB consolidation
and MSB-done ledger summaries"#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Omp {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    #[clap(long, parse(from_os_str), help = CONFIG_HELP.as_str())]
    #[clap(global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "sql")]
    #[clap(about = "Translate archive query XML files into SQL statements.")]
    QuerySql(query_sql::QuerySqlArgs),

    #[clap(alias = "consolidate")]
    #[clap(
        about = r#"Merge duplicate MSBs in science programmes and report what's left.
Consolidated programmes are written out if --output-dir is given."#
    )]
    MsbConsolidate(msb_consolidate::MsbConsolidateArgs),

    #[clap(alias = "summarise-ledger")]
    #[clap(about = "Summarise MSB-done ledger events per MSB, as json.")]
    LedgerSummary(ledger_summary::LedgerSummaryArgs),
}

impl Omp {
    pub fn run(self) -> Result<(), OmpError> {
        // Set up logging.
        let GlobalArgs { verbosity, config } = self.global_opts;
        setup_logging(verbosity).map_err(|e| OmpError::Generic(e.to_string()))?;

        // Print the version of omp and its build-time information.
        let sub_command = match &self.command {
            Command::QuerySql(_) => "query-sql",
            Command::MsbConsolidate(_) => "msb-consolidate",
            Command::LedgerSummary(_) => "ledger-summary",
        };
        info!("omp {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        let result = match self.command {
            Command::QuerySql(args) => args.run(config.as_deref()),
            Command::MsbConsolidate(args) => args.run(),
            Command::LedgerSummary(args) => args.run(),
        };
        display_warnings();
        result?;

        info!("omp {} complete.", sub_command);
        Ok(())
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write a few info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => info!("Compiled on git commit hash: {hash}{dirty}"),
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {hr}");
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
