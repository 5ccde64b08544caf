use clap::{Parser, Subcommand, ValueEnum};
use springer_downloader::{FileFormat, Language, Layout, Topic};
use std::path::PathBuf;

/// Bulk download tool for the free Springer textbook catalogs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog language (en, de)
    #[arg(short = 'L', long = "lang", global = true)]
    pub language: Option<Language>,

    /// Catalog topic (all, med)
    #[arg(short = 'T', long, global = true)]
    pub topic: Option<Topic>,

    /// Directory holding cached catalogs and the default selection
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the default catalog identifier
    GetDefaultCatalog,

    /// Make the catalog chosen with --lang/--topic the default
    SetDefaultCatalog,

    /// List books, packages or catalogs
    List {
        component: Component,

        /// Case-insensitive substring to match titles or package names
        #[arg(short = 'm', long = "match")]
        pattern: Option<String>,

        /// Show more detail per entry
        #[arg(short, long)]
        long_format: bool,
    },

    /// Fetch the catalog again and replace its cache
    RefreshCatalog {
        /// One-shot source URL; the catalog's default URL is not changed
        #[arg(short, long)]
        url: Option<String>,

        /// Refresh every catalog (ignores --url)
        #[arg(long)]
        all: bool,
    },

    /// Remove cached catalogs
    CleanCatalog {
        #[arg(short = 'F', long)]
        force: bool,

        #[arg(long)]
        all: bool,
    },

    /// Download books; re-running skips files already downloaded
    Download {
        /// Package name to match (partial name OK)
        #[arg(short, long = "package-name")]
        package: Option<String>,

        /// Title to match (partial title OK)
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, default_value = "pdf")]
        format: FileFormat,

        /// Destination directory; failures are logged to DOWNLOAD_ERRORS.txt in it
        #[arg(short, long = "dest-path", default_value = ".")]
        dest_path: PathBuf,

        /// Download again even when the file exists
        #[arg(short = 'W', long = "over-write")]
        overwrite: bool,

        /// flat, by-package, by-catalog or by-catalog-package
        #[arg(long)]
        layout: Option<Layout>,

        /// Download from every cached catalog into <dest>/<Language>/<Topic>
        #[arg(long)]
        all: bool,

        /// Print what would be downloaded without fetching anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    Books,
    Package,
    Packages,
    Catalog,
    Catalogs,
}
