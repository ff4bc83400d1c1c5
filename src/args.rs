//! These structs provide the CLI interface for the tickets CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// tickets: A command-line client for the ticket processor.
///
/// Send scanned receipts (PDF) and extra ticket lines (CSV) to the classification service, see the
/// classified lines with spending per day and per category, and export the lines back to CSV. The
/// categories and keywords the service classifies with can be managed with `tickets categories`.
///
/// Run `tickets init` first to point the program at your service.
#[derive(Debug, Parser, Clone)]
#[command(name = "tickets", version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the tickets home directory and its configuration file.
    ///
    /// Pass the address of the classification service with --api-base-url. The home directory
    /// defaults to $HOME/tickets, use --tickets-home to put it somewhere else.
    Init(InitArgs),
    /// Upload receipts and/or a CSV of ticket lines and show the classified result.
    ///
    /// At least one --pdf or a --csv is needed. The result is saved so that `tickets show` and
    /// `tickets export` can use it later.
    Upload(UploadArgs),
    /// Show the result of the most recent upload.
    Show,
    /// Export the ticket lines of the most recent upload to CSV.
    Export(ExportArgs),
    /// List, add and delete categories and their keywords.
    Categories(CategoriesArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration and saved results are held. Defaults to ~/tickets
    #[arg(long, env = "TICKETS_HOME", default_value_t = default_tickets_home())]
    tickets_home: DisplayPath,

    /// Use this service address instead of the one in the config file.
    #[arg(long, env = "TICKETS_API_BASE_URL")]
    api_base_url: Option<String>,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn tickets_home(&self) -> &DisplayPath {
        &self.tickets_home
    }

    pub fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }
}

/// (Not shown): Args for the `tickets init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The address of the classification service, e.g. http://localhost:8000/
    #[arg(long = "api-base-url", default_value = crate::config::DEFAULT_API_BASE_URL)]
    url: String,
}

impl InitArgs {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// (Not shown): Args for the `tickets upload` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct UploadArgs {
    /// A scanned receipt. Repeat for more than one.
    #[arg(long = "pdf")]
    pdfs: Vec<PathBuf>,

    /// A CSV of additional ticket lines.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also export the ticket lines to this CSV file.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Also write both chart datasets, as JSON, to this file.
    #[arg(long)]
    charts: Option<PathBuf>,
}

impl UploadArgs {
    pub fn new(pdfs: Vec<PathBuf>, csv: Option<PathBuf>) -> Self {
        Self {
            pdfs,
            csv,
            ..Self::default()
        }
    }

    pub fn with_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.export = Some(path.into());
        self
    }

    pub fn with_charts(mut self, path: impl Into<PathBuf>) -> Self {
        self.charts = Some(path.into());
        self
    }

    pub fn pdfs(&self) -> &[PathBuf] {
        &self.pdfs
    }

    pub fn csv(&self) -> Option<&Path> {
        self.csv.as_deref()
    }

    pub fn export(&self) -> Option<&Path> {
        self.export.as_deref()
    }

    pub fn charts(&self) -> Option<&Path> {
        self.charts.as_deref()
    }
}

/// (Not shown): Args for the `tickets export` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ExportArgs {
    /// Where to write the CSV. Defaults to updated_tickets.csv in the current directory.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// (Not shown): Args for the `tickets categories` command.
#[derive(Debug, Parser, Clone)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    action: CategoriesAction,
}

impl CategoriesArgs {
    pub fn action(&self) -> &CategoriesAction {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesAction {
    /// List every category with its keywords.
    List,
    /// Create a category with no keywords.
    Add {
        /// The category name.
        name: String,
    },
    /// Add a keyword to a category.
    AddKeyword {
        /// The category name.
        category: String,
        /// The keyword. Ticket lines whose description contains it get this category.
        keyword: String,
    },
    /// Delete a category and all of its keywords.
    Delete {
        /// The category name.
        category: String,
    },
    /// Delete one keyword from a category.
    DeleteKeyword {
        /// The category name.
        category: String,
        /// The keyword to remove.
        keyword: String,
    },
}

fn default_tickets_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("tickets"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --tickets-home or TICKETS_HOME instead of relying on the default \
                tickets home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("tickets")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload() {
        let args = Args::try_parse_from([
            "tickets",
            "--tickets-home",
            "/tmp/t",
            "upload",
            "--pdf",
            "a.pdf",
            "--pdf",
            "b.pdf",
            "--csv",
            "extra.csv",
        ])
        .unwrap();
        assert_eq!(args.common().tickets_home().path(), Path::new("/tmp/t"));
        match args.command() {
            Command::Upload(upload) => {
                assert_eq!(upload.pdfs().len(), 2);
                assert_eq!(upload.csv(), Some(Path::new("extra.csv")));
                assert!(upload.export().is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_categories() {
        let args = Args::try_parse_from([
            "tickets",
            "--log-level",
            "debug",
            "categories",
            "add-keyword",
            "Ocio",
            "cine",
        ])
        .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        match args.command() {
            Command::Categories(c) => match c.action() {
                CategoriesAction::AddKeyword { category, keyword } => {
                    assert_eq!(category, "Ocio");
                    assert_eq!(keyword, "cine");
                }
                other => panic!("unexpected action {other:?}"),
            },
            other => panic!("unexpected command {other:?}"),
        }
    }
}
