mod cli;

use anyhow::{bail, Result};
use clap::Parser;
use cli::{Cli, Command, Component};
use colored::*;
use log::{error, info};
use springer_downloader::{
    filter, packages, plan, AppConfig, Catalog, CatalogIdentity, CatalogStore,
    DefaultCatalogSelector, Downloader, DownloaderError, ExecutionResult, FileFormat,
    HttpFetcher, Language, Layout, PlannedDownload, Topic,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    info!("Starting springer downloader");

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("{}", format!("{:#}", e).red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::resolve(cli.config_dir.clone())?;
    let selector = DefaultCatalogSelector::new(config.default_selection_path());
    let default = selector.get().await?;
    let (language, topic) = select_pair(&cli, default);
    let selected = CatalogIdentity::new(language, topic);
    info!("Using catalog {}-{} (default {})", language.code(), topic.code(), default);

    let fetcher = Arc::new(HttpFetcher::new()?);
    let store = CatalogStore::new(config, fetcher.clone());

    match cli.command {
        Command::GetDefaultCatalog => {
            println!("{} {}", "Default:".green(), describe(default));
        }
        Command::SetDefaultCatalog => {
            let identity = selector.set_pair(language, topic).await?;
            println!("{} {}", "Old Default:".blue(), describe(default));
            println!("{} {}", "New Default:".green(), describe(identity));
        }
        Command::List {
            component,
            pattern,
            long_format,
        } => list(&store, selected?, component, pattern.as_deref(), long_format).await?,
        Command::RefreshCatalog { url, all } => {
            let targets = if all { CatalogIdentity::all() } else { vec![selected?] };
            let url = if all { None } else { url };
            for target in targets {
                let catalog = store.refresh(target, url.as_deref()).await?;
                println!("{}", catalog.summary());
            }
        }
        Command::CleanCatalog { force, all } => {
            if !force {
                bail!("The --force switch is required!");
            }
            if all {
                let removed = store.evict_all().await?;
                println!("Removed {} cached catalogs", removed);
                return Ok(());
            }
            let identity = selected?;
            if store.evict(identity).await? {
                println!("Removed cached catalog {}", identity);
            } else {
                println!("Catalog {} was not cached", identity);
            }
        }
        Command::Download {
            package,
            title,
            format,
            dest_path,
            overwrite,
            layout,
            all,
            dry_run,
        } => {
            let targets = if all { CatalogIdentity::all() } else { vec![selected?] };
            let layout = layout.unwrap_or(if all {
                Layout::ByCatalog { with_package: false }
            } else {
                Layout::Flat
            });
            let dest_root = absolute(&dest_path)?;

            let mut plans = Vec::new();
            for target in targets {
                let catalog = match store.load(target).await {
                    Ok(catalog) => catalog,
                    Err(e) if all => {
                        println!("{} {}", format!("{}:", target).yellow(), e);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                let matched = filter(&catalog.records, title.as_deref(), package.as_deref());
                info!("Selected {} of {} books from {}", matched.len(), catalog.records.len(), target);
                plans.push(plan(&matched, format, &dest_root, layout));
            }

            if dry_run {
                print_plan(&plans.concat(), format);
                return Ok(());
            }

            let total = plans.iter().map(Vec::len).sum::<usize>();
            let downloader = Downloader::new(fetcher, &dest_root)
                .with_progress(Downloader::progress_bar(total as u64));
            let result = match plans.as_slice() {
                [single] => downloader.execute(single, overwrite).await,
                _ => downloader.execute_batches(&plans, overwrite).await,
            };
            print_summary(&result, downloader.report().path());

            if !result.failed.is_empty() {
                bail!("{} downloads failed", result.failed.len());
            }
        }
    }
    Ok(())
}

/// Fills whatever the command line leaves out from the default catalog. An
/// explicit language without a topic means all disciplines. The pair is not
/// validated here.
fn select_pair(cli: &Cli, default: CatalogIdentity) -> (Language, Topic) {
    match (cli.language, cli.topic) {
        (None, None) => (default.language(), default.topic()),
        (Some(language), None) => (language, Topic::AllDisciplines),
        (None, Some(topic)) => (default.language(), topic),
        (Some(language), Some(topic)) => (language, topic),
    }
}

fn describe(identity: CatalogIdentity) -> String {
    format!(
        "{} ({}/{})",
        identity,
        identity.language().label(),
        identity.topic().label()
    )
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

async fn list(
    store: &CatalogStore,
    identity: CatalogIdentity,
    component: Component,
    pattern: Option<&str>,
    long_format: bool,
) -> Result<()> {
    if component == Component::Catalogs {
        for target in CatalogIdentity::all() {
            match store.load(target).await {
                Ok(catalog) => print_catalog(&catalog, long_format),
                Err(DownloaderError::NotCached { .. }) => println!(
                    "{} {}",
                    describe(target),
                    "not cached; run refresh-catalog".yellow()
                ),
                Err(e) => println!("{} {}", describe(target), e.to_string().red()),
            }
        }
        return Ok(());
    }

    let catalog = store.load(identity).await?;
    match component {
        Component::Books => {
            for record in filter(&catalog.records, pattern, None) {
                if long_format {
                    println!("{}\n    package: {}\n    url: {}", record.title.bold(), record.package, record.url);
                } else {
                    println!("{}", record.title);
                }
            }
        }
        Component::Package | Component::Packages => {
            let pattern = pattern.map(str::to_lowercase);
            for (name, books) in packages(&catalog.records) {
                if let Some(p) = &pattern {
                    if !name.to_lowercase().contains(p) {
                        continue;
                    }
                }
                println!("{} ({} books)", name.bold(), books.len());
                if long_format || component == Component::Package {
                    for book in books {
                        println!("    {}", book.title);
                    }
                }
            }
        }
        Component::Catalog | Component::Catalogs => print_catalog(&catalog, long_format),
    }
    Ok(())
}

fn print_catalog(catalog: &Catalog, long_format: bool) {
    println!("{}", catalog.summary());
    if long_format {
        println!("    source: {}", catalog.identity.default_url());
    }
}

fn print_plan(planned: &[PlannedDownload], format: FileFormat) {
    println!("{}", format!("DRYRUN-{}", format.extension().to_uppercase()).bold());
    for task in planned {
        let exists = if task.output_path.exists() { " (exists)" } else { "" };
        println!("{} -> {}{}", task.url, task.output_path.display(), exists.yellow());
    }
    println!("{} files planned", planned.len());
}

fn print_summary(result: &ExecutionResult, report_path: &Path) {
    println!("\n{}", "Download Summary:".bold());
    println!("Planned: {}", result.total());
    println!("Downloaded: {}", result.succeeded.to_string().green());
    println!("Skipped (already present): {}", result.skipped);
    println!("Failed: {}", result.failed.len().to_string().red());
    println!(
        "Total data transferred: {:.2} MB",
        result.bytes_downloaded as f64 / 1_048_576.0
    );

    if !result.failed.is_empty() {
        println!("\n{}", "Failed Downloads:".red().bold());
        for failure in &result.failed {
            let filename = failure
                .output_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown");
            println!("✗ {} - Error: {}", filename.red(), failure.reason);
        }
        println!("Failures logged to {}", report_path.display());
    }
}
