use clap::{Args, Subcommand};
use sf_core::Result;

use crate::manager::FeedManager;
use crate::pipeline::SyncReport;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Scrape one site, or every site when none is given, and update the stores
    Sync {
        /// Site id or alias (e.g. dlapilota, tvp)
        site: Option<String>,
    },
    /// Print the feed of a site from its store
    Render {
        site: String,
        /// Indent the XML
        #[arg(long)]
        pretty: bool,
    },
    /// List registered sites
    List,
    /// Extract a single item and print it as JSON without storing it
    Url { url: String },
}

pub async fn handle_command(args: ScraperArgs, manager: &FeedManager) -> Result<()> {
    match args.command {
        ScraperCommands::Sync { site: Some(site) } => {
            let feed = manager.get(&site)?;
            let logger = feed.logger(false);
            let report = feed.sync(&logger).await?;
            print_report(&report);
        }
        ScraperCommands::Sync { site: None } => {
            let mut failed = 0;
            for (site, result) in manager.sync_all().await {
                match result {
                    Ok(report) => print_report(&report),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: failed: {}", site, e);
                    }
                }
            }
            if failed > 0 {
                tracing::warn!("{} of {} sites failed", failed, manager.feeds().len());
            }
        }
        ScraperCommands::Render { site, pretty } => {
            let feed = manager.get(&site)?;
            println!("{}", feed.render(pretty).await?);
        }
        ScraperCommands::List => {
            println!("Available sites:");
            for feed in manager.feeds() {
                let meta = feed.metadata();
                println!(
                    "  {:<18} {} ({})",
                    feed.adapter().cli_names().join(", "),
                    meta.title,
                    feed.adapter().listing_url()
                );
            }
        }
        ScraperCommands::Url { url } => {
            let item = manager.scrape_url(&url).await?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("{}", report);
    for skipped in &report.skipped {
        println!("  skipped {} ({}): {}", skipped.url, skipped.stage, skipped.reason);
    }
}
