use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use house_scout::cache::{LookupOutcome, PropertyCache, SearchError, SqliteStore};
use house_scout::catalog::HouseCatalog;
use house_scout::config::{self, Config};
use house_scout::listings::{ListingsError, RapidApiListings, ZippopotamResolver};
use house_scout::scoring::{calculate_score, FeatureSet};
use house_scout::{address, output};

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_NOT_FOUND: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a feature-set JSON file and print the rubric breakdown
    Score {
        /// Path to a JSON file describing the house's features
        file: PathBuf,
    },
    /// Add a house to the catalog from a feature-set JSON file
    Add {
        /// Street address of the house
        address: String,
        /// Path to a JSON file describing the house's features
        file: PathBuf,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// List cataloged houses, best score first (default if no subcommand)
    List,
    /// Show one cataloged house with its full breakdown
    Show {
        /// House id as shown in list
        id: i64,
    },
    /// Re-score a cataloged house from an updated feature-set JSON file
    Update {
        /// House id as shown in list
        id: i64,
        /// Path to a JSON file describing the house's features
        file: PathBuf,
        /// Replace the house's notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Remove a house from the catalog
    Remove {
        /// House id as shown in list
        id: i64,
    },
    /// Populate the catalog with a few sample houses
    Seed,
    /// Look up a property by full address (the ZIP is read off the end)
    Lookup {
        /// Full address including ZIP, e.g. "123 Main St, Springfield, IL 62704"
        address: String,
    },
    /// Search listings under a price ceiling, by ZIP or by city
    Search {
        /// ZIP code to search
        #[arg(long, conflicts_with_all = ["city", "state"])]
        zip: Option<String>,
        /// City to search (requires --state)
        #[arg(long, requires = "state")]
        city: Option<String>,
        /// Two-letter state code
        #[arg(long)]
        state: Option<String>,
        /// Maximum listing price in dollars
        #[arg(long)]
        max_price: i64,
    },
    /// Delete stale property-cache rows
    Purge {
        /// Delete rows older than this many days
        #[arg(long)]
        days: Option<i64>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "house-scout")]
#[command(about = "House cataloging, scoring, and listings-cache CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/house-scout/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn read_features(path: &PathBuf) -> FeatureSet {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    match serde_json::from_str(&content) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Invalid feature JSON in {}: {}", path.display(), e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn open_catalog(config: &Config) -> HouseCatalog {
    let path = config::get_data_dir(config).join("catalog.db");
    match HouseCatalog::open(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to open catalog at {}: {}", path.display(), e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn open_cache(config: &Config) -> PropertyCache<SqliteStore> {
    let path = config::get_data_dir(config).join("property_cache.db");
    match SqliteStore::open(&path) {
        Ok(store) => PropertyCache::with_freshness_days(store, config.freshness_days),
        Err(e) => {
            eprintln!("Failed to open property cache at {}: {}", path.display(), e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn listings_client(config: &Config) -> RapidApiListings {
    let Some(key) = config.rapidapi_key.as_deref() else {
        eprintln!(
            "No RapidAPI key configured. Set rapidapi_key in {} or export {}.",
            config::get_config_path().display(),
            config::API_KEY_ENV
        );
        std::process::exit(EXIT_CONFIG);
    };
    let timeout = Duration::from_secs(config.request_timeout_secs);
    match RapidApiListings::new(key, timeout) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create listings client: {}", e);
            std::process::exit(EXIT_NETWORK);
        }
    }
}

/// Map a search failure onto the process exit codes. `NoPropertiesInZip`
/// and `UnknownCity` are user-facing misses, not infrastructure failures.
fn exit_for_search_error(e: &SearchError) -> i32 {
    match e {
        SearchError::NoPropertiesInZip(_) | SearchError::UnknownCity { .. } => EXIT_NOT_FOUND,
        SearchError::Upstream(ListingsError::Auth) => EXIT_AUTH,
        SearchError::Upstream(_) => EXIT_NETWORK,
        SearchError::Store(_) => EXIT_CONFIG,
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::List);

    let default_directive = if cli.verbose {
        "house_scout=debug"
    } else {
        "house_scout=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.map(PathBuf::from);
    let config = match config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let use_colors = output::should_use_colors();

    match command {
        Commands::Score { file } => {
            let features = read_features(&file);
            let breakdown = calculate_score(&features);
            println!("{}", output::format_breakdown(&breakdown, use_colors));
        }
        Commands::Add {
            address,
            file,
            notes,
        } => {
            let features = read_features(&file);
            let catalog = open_catalog(&config);
            match catalog.add(&address, &features, notes.as_deref()) {
                Ok(house) => {
                    println!("{}", output::format_house_detail(&house, use_colors));
                }
                Err(e) => {
                    eprintln!("Failed to add house: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        Commands::List => {
            let catalog = open_catalog(&config);
            match catalog.list() {
                Ok(houses) => println!("{}", output::format_house_list(&houses, use_colors)),
                Err(e) => {
                    eprintln!("Failed to list houses: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        Commands::Show { id } => {
            let catalog = open_catalog(&config);
            match catalog.get(id) {
                Ok(house) => println!("{}", output::format_house_detail(&house, use_colors)),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_NOT_FOUND);
                }
            }
        }
        Commands::Update { id, file, notes } => {
            let features = read_features(&file);
            let catalog = open_catalog(&config);
            match catalog.update(id, &features, notes.as_deref()) {
                Ok(house) => println!("{}", output::format_house_detail(&house, use_colors)),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_NOT_FOUND);
                }
            }
        }
        Commands::Remove { id } => {
            let catalog = open_catalog(&config);
            match catalog.remove(id) {
                Ok(()) => println!("Removed house #{}", id),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_NOT_FOUND);
                }
            }
        }
        Commands::Seed => {
            let catalog = open_catalog(&config);
            match catalog.seed() {
                Ok(houses) => {
                    println!("Seeded {} sample houses:", houses.len());
                    println!("{}", output::format_house_list(&houses, use_colors));
                }
                Err(e) => {
                    eprintln!("Failed to seed catalog: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        Commands::Lookup { address: raw } => {
            let Some(zip) = address::extract_zip(&raw) else {
                eprintln!("No ZIP code found at the end of \"{}\". Include one, e.g. \"123 Main St, Springfield, IL 62704\".", raw);
                std::process::exit(EXIT_CONFIG);
            };
            let cache = open_cache(&config);
            let listings = listings_client(&config);
            match cache.lookup(&listings, &raw, &zip).await {
                Ok(LookupOutcome::Found(prop)) => {
                    println!("{}", output::format_property(&prop, use_colors));
                }
                Ok(LookupOutcome::NotFound { samples }) => {
                    eprintln!("No property matching \"{}\" in ZIP {}.", raw, zip);
                    if !samples.is_empty() {
                        eprintln!("Addresses found there include:");
                        for sample in samples {
                            eprintln!("  {}", sample);
                        }
                    }
                    std::process::exit(EXIT_NOT_FOUND);
                }
                Err(e) => {
                    eprintln!("Lookup failed: {}", e);
                    std::process::exit(exit_for_search_error(&e));
                }
            }
        }
        Commands::Search {
            zip,
            city,
            state,
            max_price,
        } => {
            let cache = open_cache(&config);
            let listings = listings_client(&config);
            match (zip, city, state) {
                (Some(zip), _, _) => {
                    match cache.search_by_price_ceiling(&listings, &zip, max_price).await {
                        Ok(props) => {
                            println!("{}", output::format_property_list(&props, use_colors))
                        }
                        Err(e) => {
                            eprintln!("Search failed: {}", e);
                            std::process::exit(exit_for_search_error(&e));
                        }
                    }
                }
                (None, Some(city), Some(state)) => {
                    let resolver = match ZippopotamResolver::new(Duration::from_secs(
                        config.request_timeout_secs,
                    )) {
                        Ok(r) => r,
                        Err(e) => {
                            eprintln!("Failed to create geocoder client: {}", e);
                            std::process::exit(EXIT_NETWORK);
                        }
                    };
                    match cache
                        .search_by_city(&listings, &resolver, &city, &state, max_price)
                        .await
                    {
                        Ok(result) => {
                            println!(
                                "{}",
                                output::format_property_list(&result.properties, use_colors)
                            );
                            println!();
                            println!("{}", output::format_city_summary(&result));
                        }
                        Err(e) => {
                            eprintln!("Search failed: {}", e);
                            std::process::exit(exit_for_search_error(&e));
                        }
                    }
                }
                _ => {
                    eprintln!("Provide either --zip, or --city with --state.");
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        Commands::Purge { days } => {
            let cache = open_cache(&config);
            let days = days.unwrap_or(config.purge_days);
            match cache.purge_older_than(days) {
                Ok(deleted) => println!("Purged {} cached properties older than {} days", deleted, days),
                Err(e) => {
                    eprintln!("Purge failed: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
    }

    std::process::exit(EXIT_SUCCESS);
}
