use analytics::{EventTracker, DEFAULT_LIMIT};
use anyhow::Context;
use api_client::HttpCollector;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use configuration::LogFormat;
use events::{AnalyticsEvent, BatchPayload, Properties};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The main entry point for the fxtools command-line application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => configuration::load_config_from(path)?,
        None => configuration::load_config()?,
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _guard = configuration::init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Serve { addr } => web_server::run_server(addr).await,
        command => {
            let collector = HttpCollector::new(&config.collector)?;
            let (tracker, location) = EventTracker::from_config(&config.tracking, Arc::new(collector))?;
            if let Some(at) = &cli.at {
                location.navigate(at)?;
            }
            handle_tracking(command, &tracker)?;

            // Deliveries are fire-and-forget; give them a chance before the process exits.
            tracker.settle().await;
            print_summary(&tracker);
            Ok(())
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Records site interactions and delivers them to the analytics collector.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to ./config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// The page the visitor is on, absolute or relative to the configured location.
    #[arg(long, global = true)]
    at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a search.
    Search {
        #[arg(long)]
        query: String,
        /// Number of results the search produced.
        #[arg(long)]
        results: Option<u64>,
        /// Kind of search, e.g. "experts" or "blog" (defaults to "global").
        #[arg(long)]
        search_type: Option<String>,
    },
    /// Track a filter selection.
    Filter {
        #[arg(long)]
        filter_type: String,
        #[arg(long)]
        value: String,
        /// Page the filter was applied on (defaults to the current path).
        #[arg(long)]
        page: Option<String>,
    },
    /// Track a page view.
    PageView {
        #[arg(long)]
        page: String,
        /// Extra properties as key=value, repeatable.
        #[arg(long = "prop", value_parser = parse_key_value)]
        props: Vec<(String, String)>,
    },
    /// Track a pagination step.
    Paginate {
        #[arg(long)]
        page: u64,
        #[arg(long)]
        per_page: u64,
        #[arg(long)]
        total: u64,
    },
    /// Track a download click.
    Download {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Queue previously recorded events on the batched delivery path.
    Replay {
        /// A JSON file holding either an array of events or `{"events": [...]}`.
        #[arg(long)]
        file: PathBuf,
    },
    /// Run the development analytics collector.
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_tracking(command: Commands, tracker: &EventTracker) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            query,
            results,
            search_type,
        } => tracker.track_search(&query, results, search_type.as_deref(), None),
        Commands::Filter {
            filter_type,
            value,
            page,
        } => tracker.track_filter(&filter_type, value, page.as_deref()),
        Commands::PageView { page, props } => {
            let extra: Properties = props
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            tracker.track_page_view(&page, Some(extra));
        }
        Commands::Paginate {
            page,
            per_page,
            total,
        } => tracker.track_pagination(page, per_page, total),
        Commands::Download { id, name } => tracker.track_download(&id, &name),
        Commands::Replay { file } => {
            let events = read_events(&file)?;
            tracing::info!(count = events.len(), file = %file.display(), "Replaying events.");
            for event in events {
                tracker.enqueue_batched(event);
            }
        }
        Commands::Serve { .. } => anyhow::bail!("serve does not track events"),
    }
    Ok(())
}

fn read_events(path: &Path) -> anyhow::Result<Vec<AnalyticsEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    // Accept both a bare array and the batch endpoint's body.
    if let Ok(batch) = serde_json::from_str::<BatchPayload>(&raw) {
        return Ok(batch.events);
    }
    serde_json::from_str::<Vec<AnalyticsEvent>>(&raw)
        .with_context(|| format!("{} holds neither an event array nor a batch", path.display()))
}

/// Prints what the tracker recorded during this run.
fn print_summary(tracker: &EventTracker) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Event", "Details", "Timestamp"]);
    for event in tracker.events() {
        table.add_row(vec![
            event.kind().to_string(),
            serde_json::Value::Object(event.properties().clone()).to_string(),
            event.timestamp().to_rfc3339(),
        ]);
    }
    println!("{table}");

    let popular = tracker.popular_searches(DEFAULT_LIMIT);
    if !popular.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Query", "Searches"]);
        for entry in popular {
            table.add_row(vec![entry.query, entry.count.to_string()]);
        }
        println!("{table}");
    }

    let filters = tracker.filter_usage_stats();
    if !filters.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Filter", "Uses"]);
        for (filter_type, uses) in filters {
            table.add_row(vec![filter_type, uses.to_string()]);
        }
        println!("{table}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("referrer = newsletter").unwrap(),
            ("referrer".to_string(), "newsletter".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=orphan").is_err());
    }

    const REPLAY_EVENTS: &str = r#"[
        {"event":"search","properties":{"query":"grid"},"timestamp":"2024-05-01T10:00:00.000Z"},
        {"event":"download_click","properties":{"downloadId":"ea-3"},"timestamp":"2024-05-01T10:00:02.000Z"}
    ]"#;

    fn replay_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_events_accepts_bare_array() {
        let file = replay_file(REPLAY_EVENTS);
        let events = read_events(file.path()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].property_str("query"), Some("grid"));
        assert_eq!(events[1].property_str("downloadId"), Some("ea-3"));
    }

    #[test]
    fn test_read_events_accepts_batch_body() {
        let file = replay_file(&format!(r#"{{"events": {REPLAY_EVENTS}}}"#));
        let events = read_events(file.path()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind().as_str(), "search");
    }

    #[test]
    fn test_read_events_rejects_other_json() {
        let file = replay_file(r#"{"event":"search"}"#);
        assert!(read_events(file.path()).is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fxtools",
            "filter",
            "--filter-type",
            "platform",
            "--value",
            "MT4",
            "--at",
            "/experts",
        ])
        .unwrap();

        assert_eq!(cli.at.as_deref(), Some("/experts"));
        assert!(matches!(cli.command, Commands::Filter { ref filter_type, .. } if filter_type == "platform"));
    }
}
