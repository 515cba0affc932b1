//! # Precedent Catalog CLI Driver
//!
//! ## Purpose
//! Command-line entry point for the catalog engine: loads a dataset file,
//! runs compound filter queries, and prints results and statistics.
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Open the catalog (durable store + persisted uploads)
//! 4. Merge the dataset payload, if one was given
//! 5. Run the requested query and render results

use clap::{Arg, Command};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use precedent_catalog::{
    config::Config,
    errors::{CatalogError, Result},
    utils::TextUtils,
    Catalog, CatalogFilters, SearchScope, StatusFilter,
};

fn main() -> Result<()> {
    let matches = Command::new("precedent-catalog")
        .version("0.1.0")
        .author("Legal Search Team")
        .about("Catalog browser core for legal precedent documents")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("dataset")
                .short('d')
                .long("dataset")
                .value_name("FILE")
                .help("Dataset JSON file to merge before querying"),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("TEXT")
                .help("Free-text search terms"),
        )
        .arg(
            Arg::new("kind")
                .long("kind")
                .value_name("LABEL")
                .help("Restrict to one display kind (e.g. \"Súmula\")"),
        )
        .arg(
            Arg::new("organ")
                .long("organ")
                .value_name("ORGAN")
                .help("Organ containment filter for orientações jurisprudenciais"),
        )
        .arg(
            Arg::new("number")
                .short('n')
                .long("number")
                .value_name("NUMBER")
                .help("Exact number match"),
        )
        .arg(
            Arg::new("tags")
                .long("tags")
                .value_name("TAGS")
                .help("Comma-separated required tags"),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .value_name("STATUS")
                .help("Status filter: all, active, revoked")
                .default_value("all"),
        )
        .arg(
            Arg::new("everything")
                .long("everything")
                .help("Search uploaded documents too (requires free text)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Print catalog statistics")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").expect("has default");
    let config = Config::from_file(config_path)?;

    init_logging(&config)?;
    info!("Configuration loaded from: {}", config_path);

    let mut catalog = Catalog::open(&config)?;

    if let Some(dataset_path) = matches.get_one::<String>("dataset") {
        let content = std::fs::read_to_string(dataset_path)?;
        let payload: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| CatalogError::MalformedDataset {
                details: format!("dataset file {}: {}", dataset_path, e),
            })?;
        let count = catalog.load_dataset(&payload)?;
        info!("Merged {} items from {}", count, dataset_path);
    }

    if matches.get_flag("stats") {
        let stats = catalog.stats();
        println!(
            "Case-law items: {} total, {} active, {} revoked",
            stats.total, stats.active, stats.revoked
        );
    }

    let filters = CatalogFilters {
        status: parse_status(matches.get_one::<String>("status").expect("has default"))?,
        kind: matches.get_one::<String>("kind").cloned(),
        organ: matches.get_one::<String>("organ").cloned(),
        number: matches.get_one::<String>("number").cloned(),
        tags: matches.get_one::<String>("tags").cloned(),
        free_text: matches.get_one::<String>("query").cloned(),
        scope: if matches.get_flag("everything") {
            SearchScope::Everything
        } else {
            SearchScope::CaseLaw
        },
    };

    let results = catalog.search(&filters);
    println!("{} result(s)", results.len());

    for item in results.iter().take(config.search.max_results) {
        render_item(item, &catalog);
    }

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level = config
        .logging
        .level
        .parse()
        .map_err(|_| CatalogError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        })?;

    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::from_level(log_level)),
    );

    subscriber.init();
    Ok(())
}

fn parse_status(value: &str) -> Result<StatusFilter> {
    match value.to_lowercase().as_str() {
        "all" => Ok(StatusFilter::All),
        "active" => Ok(StatusFilter::Active),
        "revoked" => Ok(StatusFilter::Revoked),
        other => Err(CatalogError::Validation {
            field: "status".to_string(),
            reason: format!("Unknown status filter '{}'", other),
        }),
    }
}

fn render_item(item: &precedent_catalog::CatalogItem, catalog: &Catalog) {
    let heading = match (&item.number, &item.theme, &item.name) {
        (Some(number), _, _) => format!("{} {}", item.kind.display_label(), number),
        (None, Some(theme), _) => format!("{} Tema {}", item.kind.display_label(), theme),
        (None, None, Some(name)) => format!("{} {}", item.kind.display_label(), name),
        (None, None, None) => item.kind.display_label().to_string(),
    };

    let marker = if item.revoked { " [cancelada]" } else { "" };
    let star = if catalog.store().is_favorite(&item.id) {
        "* "
    } else {
        "  "
    };

    println!("{}{}{}", star, heading, marker);
    if !item.title.is_empty() {
        println!("    {}", TextUtils::truncate(&item.title, 100));
    }

    let body = if item.full_text.is_empty() {
        item.extracted_text.as_deref().unwrap_or("")
    } else {
        &item.full_text
    };
    if !body.is_empty() {
        println!("    {}", TextUtils::extract_preview(body, 25));
    }

    if let Some(note) = catalog.store().annotation_for(&item.id) {
        println!("    nota: {}", TextUtils::truncate(note, 80));
    }
    let tags = catalog.store().tags_for(&item.id);
    if !tags.is_empty() {
        println!("    tags: {}", tags.join(", "));
    }
}
