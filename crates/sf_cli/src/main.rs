use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sf_core::{Settings, UpsertPolicy};
use sf_scrapers::{get_site_adapters, handle_command, init_logging, FeedManager, ScraperArgs, ScraperCommands};
use sf_web::{create_app, AppState};
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;
        let too_long = || format!("Duration too long: {}", s);

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number.parse::<u64>().map_err(|_| too_long())?;
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(too_long)?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing number without a unit counts as seconds
        if !current_number.is_empty() {
            let num = current_number.parse::<u64>().map_err(|_| too_long())?;
            total_seconds = total_seconds.checked_add(num).ok_or_else(too_long)?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "sf",
    author,
    version,
    about = "Scrapes news sites into per-site stores and serves them as RSS feeds",
    long_about = None
)]
struct Cli {
    /// JSON settings file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding one SQLite file per site
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Storage backend: sqlite or memory
    #[arg(long, global = true)]
    storage: Option<String>,
    /// Number of items kept per site
    #[arg(long, global = true)]
    retention: Option<usize>,
    /// overwrite (refetch every listed item) or skip-known
    #[arg(long, global = true)]
    policy: Option<UpsertPolicy>,
    /// Timeout of a single page fetch (e.g. 20s)
    #[arg(long, global = true)]
    timeout: Option<HumanDuration>,
    /// Retries of a failed page fetch
    #[arg(long, global = true)]
    retries: Option<u32>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the feeds over HTTP
    Serve {
        #[arg(long)]
        bind: Option<String>,
        /// Also sync every site in the background with this interval (e.g. 30m)
        #[arg(long)]
        interval: Option<HumanDuration>,
        /// Answer feed requests from the store without running the scraper
        #[arg(long)]
        no_refresh_on_request: bool,
    },
    /// Scrape one site, or all sites, and update the stores
    Sync {
        site: Option<String>,
        /// Run in periodic mode with the specified interval (e.g. 1h, 30m, 1d, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Print the feed of a site from its store
    Render {
        site: String,
        #[arg(long)]
        pretty: bool,
    },
    /// List registered sites
    List,
    /// Extract a single item and print it as JSON
    Url { url: String },
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        settings.data_dir = data_dir.clone();
    }
    if let Some(storage) = &cli.storage {
        settings.storage = storage.clone();
    }
    if let Some(retention) = cli.retention {
        settings.retention = retention;
    }
    if let Some(policy) = cli.policy {
        settings.policy = policy;
    }
    if let Some(timeout) = cli.timeout {
        settings.fetch_timeout_secs = timeout.0.as_secs();
    }
    if let Some(retries) = cli.retries {
        settings.max_retries = retries;
    }
    if let Commands::Serve {
        bind,
        no_refresh_on_request,
        ..
    } = &cli.command
    {
        if let Some(bind) = bind {
            settings.bind = bind.clone();
        }
        if *no_refresh_on_request {
            settings.refresh_on_request = false;
        }
    }

    settings.validate()?;
    Ok(settings)
}

async fn serve(
    manager: Arc<FeedManager>,
    settings: &Settings,
    interval: Option<HumanDuration>,
) -> anyhow::Result<()> {
    if let Some(interval) = interval {
        let manager = manager.clone();
        tokio::spawn(async move {
            loop {
                for (site, result) in manager.sync_all().await {
                    match result {
                        Ok(report) => info!("{}", report),
                        Err(e) => tracing::warn!("{}: background sync failed: {}", site, e),
                    }
                }
                tokio::time::sleep(interval.0).await;
            }
        });
    }

    let app = create_app(AppState::new(manager, settings));
    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!("Serving feeds on http://{}/feeds/<site>", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { Level::DEBUG } else { Level::INFO });

    let settings = load_settings(&cli)?;
    let manager = Arc::new(FeedManager::from_settings(&settings, get_site_adapters()).await?);
    let names: Vec<String> = manager.sites().into_iter().map(|s| s.id).collect();
    info!(
        "Sites initialized: {} (storage: {}, policy: {}, retention: {})",
        names.join(", "),
        settings.storage,
        settings.policy,
        settings.retention
    );

    match cli.command {
        Commands::Serve { interval, .. } => serve(manager, &settings, interval).await?,
        Commands::Sync { site, interval } => {
            let args = ScraperArgs {
                command: ScraperCommands::Sync { site },
            };
            if let Some(interval) = interval {
                info!("Running in periodic mode with {}s interval", interval.0.as_secs());
                loop {
                    if let Err(e) = handle_command(args.clone(), &manager).await {
                        eprintln!("Error during sync: {}", e);
                    }
                    info!("Waiting {}s before next sync", interval.0.as_secs());
                    tokio::time::sleep(interval.0).await;
                }
            } else {
                handle_command(args, &manager).await?;
            }
        }
        Commands::Render { site, pretty } => {
            let args = ScraperArgs {
                command: ScraperCommands::Render { site, pretty },
            };
            handle_command(args, &manager).await?;
        }
        Commands::List => {
            let args = ScraperArgs {
                command: ScraperCommands::List,
            };
            handle_command(args, &manager).await?;
        }
        Commands::Url { url } => {
            info!("Scraping single URL: {}", url);
            let args = ScraperArgs {
                command: ScraperCommands::Url { url },
            };
            handle_command(args, &manager).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_human_duration() {
        assert_eq!("45s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(45));
        assert_eq!("1h30m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(5400));
        assert_eq!("2d".parse::<HumanDuration>().unwrap().0, Duration::from_secs(172800));
        assert_eq!("90".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert!("".parse::<HumanDuration>().is_err());
        assert!("5w".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_human_duration_overflow() {
        assert!("213503982334602d".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999s".parse::<HumanDuration>().is_err());
        assert!(format!("{}s1s", u64::MAX).parse::<HumanDuration>().is_err());
        assert_eq!(
            format!("{}", u64::MAX).parse::<HumanDuration>().unwrap().0,
            Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"retention": 10, "storage": "memory", "bind": "0.0.0.0:9000"}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::parse_from([
            "sf", "--config", path, "--retention", "5", "--policy", "skip-known", "serve",
            "--no-refresh-on-request",
        ]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.retention, 5);
        assert_eq!(settings.storage, "memory");
        assert_eq!(settings.bind, "0.0.0.0:9000");
        assert_eq!(settings.policy, UpsertPolicy::SkipKnown);
        assert!(!settings.refresh_on_request);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let cli = Cli::parse_from(["sf", "--retention", "0", "list"]);
        assert!(load_settings(&cli).is_err());
        assert!(Cli::try_parse_from(["sf", "--policy", "sometimes", "list"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sf", "sync", "nuclearpl", "--timeout", "1m", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.timeout, Some(HumanDuration(Duration::from_secs(60))));
        assert!(matches!(cli.command, Commands::Sync { site: Some(ref s), interval: None } if s == "nuclearpl"));
    }
}
