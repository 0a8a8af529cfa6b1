use std::{fmt::Display, str::FromStr};

use clap::Parser;
use tracing_subscriber::filter::{self, Directive};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub args: Args,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Args, Clone)]
pub struct Args {
    #[clap(required_unless_present = "print_log_dir")]
    pub owner: Option<String>,
    #[clap(required_unless_present = "print_log_dir")]
    pub repo: Option<String>,
    #[clap(long, short, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    #[clap(long, short)]
    pub print_log_dir: bool,
    /// GitHub personal access token
    #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(clap::Subcommand, Clone)]
pub enum Command {
    /// Open a new issue (the default when no subcommand is given)
    Create(FieldArgs),
    /// Edit an existing issue
    Edit {
        number: u64,
        #[clap(flatten)]
        fields: FieldArgs,
    },
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct FieldArgs {
    #[clap(long, short)]
    pub title: Option<String>,
    #[clap(long, short)]
    pub body: Option<String>,
    /// Write the body in $EDITOR
    #[clap(long, short)]
    pub editor: bool,
    /// Login of the user to assign
    #[clap(long, short)]
    pub assignee: Option<String>,
    /// Milestone title or number
    #[clap(long, short)]
    pub milestone: Option<String>,
    /// Label to apply, may be repeated
    #[clap(long = "label", short = 'L')]
    pub labels: Vec<String>,
    /// Pick fields from a menu before saving
    #[clap(long, short)]
    pub interactive: bool,
    /// Do not ask before discarding changes
    #[clap(long, short)]
    pub yes: bool,
    /// Print the saved issue as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    None,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::None => "none",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<LogLevel> for Directive {
    type Error = filter::ParseError;
    fn try_from(value: LogLevel) -> Result<Self, Self::Error> {
        match value {
            LogLevel::None => Directive::from_str("off"),
            level => Directive::from_str(&level.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edit_with_repeated_labels() {
        let cli = Cli::try_parse_from([
            "issue-modify",
            "octo",
            "hello",
            "--token",
            "t",
            "edit",
            "12",
            "-L",
            "bug",
            "--label",
            "docs",
            "--milestone",
            "v1.0",
        ])
        .unwrap();
        assert_eq!(cli.args.owner.as_deref(), Some("octo"));
        let Some(Command::Edit { number, fields }) = cli.command else {
            panic!("expected edit subcommand");
        };
        assert_eq!(number, 12);
        assert_eq!(fields.labels, vec!["bug".to_string(), "docs".to_string()]);
        assert_eq!(fields.milestone.as_deref(), Some("v1.0"));
    }

    #[test]
    fn print_log_dir_needs_no_repository() {
        let cli = Cli::try_parse_from(["issue-modify", "--print-log-dir"]).unwrap();
        assert!(cli.args.print_log_dir);
        assert!(cli.command.is_none());
    }

    #[test]
    fn none_log_level_turns_logging_off() {
        let directive = Directive::try_from(LogLevel::None).unwrap();
        assert_eq!(directive.to_string(), "off");
        let directive = Directive::try_from(LogLevel::Warn).unwrap();
        assert_eq!(directive.to_string(), "warn");
    }
}
