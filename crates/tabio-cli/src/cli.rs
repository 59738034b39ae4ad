//! CLI argument definitions for `tabio`.

use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

use crate::logging::{LogConfig, LogFormat};

#[derive(Parser)]
#[command(
    name = "tabio",
    version,
    about = "Inspect and convert astronomical tables",
    long_about = "Inspect and convert astronomical tables.\n\n\
                  Reads IPAC, VOTable, CSV and RDB files; writes those plus HTML.\n\
                  Formats are detected from file extensions unless given explicitly."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// TOML configuration applied to every table the command creates.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Level for the tabio crates: `--log-level` wins over `-v`/`-q`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level
            .map_or_else(|| self.verbosity.tracing_level_filter(), LogLevelArg::level_filter)
    }

    /// Codec diagnostics are reported only while warnings are logged.
    pub fn reports_diagnostics(&self) -> bool {
        self.level_filter() >= LevelFilter::WARN
    }

    /// Logging setup for these flags. `RUST_LOG` applies only when no level
    /// flag was given; module targets are shown from `debug` on.
    pub fn log_config(&self, stderr_is_terminal: bool) -> LogConfig {
        let level_filter = self.level_filter();
        let with_ansi = match self.color.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.log_file.is_none() && stderr_is_terminal,
        };
        LogConfig {
            level_filter,
            use_env_filter: self.log_level.is_none() && !self.verbosity.is_present(),
            with_target: level_filter >= LevelFilter::DEBUG,
            with_ansi,
            format: self.log_format.into(),
            log_file: self.log_file.clone(),
            ..LogConfig::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the columns, keywords and comments of a table.
    Describe(DescribeArgs),

    /// Read a table in one format and write it in another.
    Convert(ConvertArgs),

    /// List registered formats with their operations and extensions.
    Formats,
}

#[derive(Parser)]
pub struct DescribeArgs {
    /// Table file to describe.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Format tag (default: detected from the file extension).
    #[arg(long = "format", value_name = "TAG")]
    pub format: Option<String>,

    /// Index of the table to read from a multi-table VOTable.
    #[arg(long = "table", value_name = "INDEX")]
    pub table: Option<usize>,

    /// Codec option, repeatable.
    #[arg(short = 'O', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Emit the description as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct ConvertArgs {
    /// Source table file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Destination file.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Source format tag (default: detected from INPUT).
    #[arg(long = "from", value_name = "TAG")]
    pub from: Option<String>,

    /// Destination format tag (default: detected from OUTPUT).
    #[arg(long = "to", value_name = "TAG")]
    pub to: Option<String>,

    /// Replace OUTPUT if it exists.
    #[arg(long = "overwrite")]
    pub overwrite: bool,

    /// Index of the table to read from a multi-table VOTable.
    #[arg(long = "table", value_name = "INDEX", conflicts_with = "all")]
    pub table: Option<usize>,

    /// Convert every table of the source as a table set.
    #[arg(long = "all")]
    pub all: bool,

    /// Codec option passed to the reader, repeatable.
    #[arg(short = 'O', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Codec option passed to the writer, repeatable.
    #[arg(long = "write-option", value_name = "KEY=VALUE")]
    pub write_options: Vec<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        }
    }
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "tabio",
            "convert",
            "in.xml",
            "out.tbl",
            "--table",
            "1",
            "-O",
            "delimiter=;",
            "--overwrite",
        ])
        .unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.table, Some(1));
        assert_eq!(args.options, vec!["delimiter=;".to_string()]);
        assert!(args.overwrite);
        assert!(!args.all);
    }

    #[test]
    fn test_table_conflicts_with_all() {
        let result =
            Cli::try_parse_from(["tabio", "convert", "a.xml", "b.xml", "--table", "0", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["tabio", "formats", "--config", "tabio.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("tabio.toml")));
        assert!(matches!(cli.command, Command::Formats));
    }

    #[test]
    fn test_log_config_defaults() {
        let cli = Cli::try_parse_from(["tabio", "formats"]).unwrap();
        let config = cli.log_config(true);
        assert_eq!(config.level_filter, LevelFilter::WARN);
        assert!(config.use_env_filter);
        assert!(config.with_ansi);
        assert!(!config.with_target);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(cli.reports_diagnostics());
        assert!(!cli.log_config(false).with_ansi);
    }

    #[test]
    fn test_log_level_overrides_quiet() {
        let cli = Cli::try_parse_from(["tabio", "formats", "-q", "--log-level", "debug"]).unwrap();
        let config = cli.log_config(true);
        assert_eq!(config.level_filter, LevelFilter::DEBUG);
        assert!(!config.use_env_filter);
        assert!(config.with_target);
        assert!(cli.reports_diagnostics());

        let quiet = Cli::try_parse_from(["tabio", "formats", "-q"]).unwrap();
        assert_eq!(quiet.level_filter(), LevelFilter::ERROR);
        assert!(!quiet.reports_diagnostics());
    }

    #[test]
    fn test_log_file_disables_auto_color() {
        let cli = Cli::try_parse_from([
            "tabio",
            "formats",
            "--log-file",
            "tabio.log",
            "--log-format",
            "json",
        ])
        .unwrap();
        let config = cli.log_config(true);
        assert!(!config.with_ansi);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_file, Some(PathBuf::from("tabio.log")));

        let forced = Cli::try_parse_from(["tabio", "formats", "--color", "always", "--log-file", "a.log"])
            .unwrap();
        assert!(forced.log_config(false).with_ansi);
    }
}
