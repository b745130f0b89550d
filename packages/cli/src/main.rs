#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Headless driver for the sausage map.
//!
//! Mounts a map controller against the live API (or a local `GeoJSON`
//! file), waits for the polling places to load and then either prints
//! what the map shows or clicks it and prints what the click found.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sausage_map_analytics::{AnalyticsSink, GoogleAnalyticsSink, LogSink};
use sausage_map_map::view::{MapSize, Pixel};
use sausage_map_map::{
    DataStatus, FeatureSource, HttpFeatureSource, MapConfig, MapController, MapDeps, MapProps,
    MapTarget, StaticFeatureSource, proj,
};
use sausage_map_map_models::{
    Election, ElectionId, FilterOption, GeoPoint, MapFilterOptions, MapSearchResult, Noms,
    PollingPlaceFeature,
};

#[derive(Parser)]
#[command(name = "sausage_map_cli", about = "Headless sausage map driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the map, wait for polling places and print what it shows
    Inspect {
        #[command(flatten)]
        mount: MountArgs,
    },
    /// Mount the map and click it, printing the polling places under the click
    Query {
        #[command(flatten)]
        mount: MountArgs,
        /// Click x in pixels (defaults to the middle of the map)
        #[arg(long)]
        x: Option<f64>,
        /// Click y in pixels (defaults to the middle of the map)
        #[arg(long)]
        y: Option<f64>,
    },
}

#[derive(Args)]
struct MountArgs {
    /// Election identifier sent to the map endpoint
    #[arg(long)]
    election: String,
    /// Longitude the map opens on
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// Latitude the map opens on
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Zoom level the map opens at
    #[arg(long, default_value = "10")]
    zoom: u8,
    /// Serve polling places from a local `GeoJSON` file instead of the API
    #[arg(long)]
    geojson: Option<PathBuf>,
    /// Map config TOML (defaults to the built-in one)
    #[arg(long)]
    config: Option<PathBuf>,
    /// API base URL (overrides config and `SAUSAGE_MAP_API_BASE_URL`)
    #[arg(long)]
    api_base_url: Option<String>,
    /// Map width in pixels
    #[arg(long, default_value = "1024")]
    width: u32,
    /// Map height in pixels
    #[arg(long, default_value = "768")]
    height: u32,
    /// Comma-separated filters: vego, halal, coffee, `bacon_and_eggs`
    #[arg(long, value_delimiter = ',', value_parser = parse_filter)]
    filter: Vec<FilterOption>,
    #[command(flatten)]
    search: SearchArgs,
}

#[derive(Args)]
struct SearchArgs {
    /// Longitude of a searched location
    #[arg(long, allow_negative_numbers = true, requires = "search_lat")]
    search_lon: Option<f64>,
    /// Latitude of a searched location
    #[arg(long, allow_negative_numbers = true, requires = "search_lon")]
    search_lat: Option<f64>,
    /// Address of the searched location
    #[arg(long, default_value = "")]
    address: String,
    /// Search extent as `min_lon,min_lat,max_lon,max_lat`
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    extent: Option<Vec<f64>>,
}

fn parse_filter(s: &str) -> Result<FilterOption, String> {
    FilterOption::from_str(s.trim()).map_err(|_| format!("unknown filter '{s}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { mount } => {
            let mut map = mount_map(&mount, Box::new(|_| {}))?;
            settle(&mut map).await?;
            print_map(&map);
            map.dispose();
        }
        Commands::Query { mount, x, y } => {
            let mut map = mount_map(
                &mount,
                Box::new(|features: Vec<PollingPlaceFeature>| {
                    for feature in &features {
                        print_feature(feature);
                    }
                }),
            )?;
            settle(&mut map).await?;

            let size = map.target().size;
            let pixel = Pixel::new(
                x.unwrap_or(f64::from(size.width) / 2.0),
                y.unwrap_or(f64::from(size.height) / 2.0),
            );
            let outcome = map.click(pixel);
            println!(
                "{} polling places under ({}, {}), {} shown",
                outcome.hits, pixel.x, pixel.y, outcome.forwarded
            );
            map.dispose();
        }
    }

    Ok(())
}

fn mount_map(
    args: &MountArgs,
    on_query_map: sausage_map_map::controller::QueryCallback,
) -> Result<MapController, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => MapConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => MapConfig::embedded(),
    }
    .with_env_overrides();

    if let Some(url) = &args.api_base_url {
        config.api_base_url.clone_from(url);
    }

    let source: Arc<dyn FeatureSource> = match &args.geojson {
        Some(path) => Arc::new(load_geojson(path)?),
        None => Arc::new(HttpFeatureSource::new(&config)?),
    };

    let analytics: Arc<dyn AnalyticsSink> = match config.google_analytics_ua.as_deref() {
        Some(ua) => Arc::new(GoogleAnalyticsSink::new(ua)?),
        None => Arc::new(LogSink),
    };

    let props = MapProps {
        election: Election {
            id: ElectionId::new(args.election.as_str()),
            name: String::new(),
            geom: GeoPoint::new(args.lon, args.lat),
            default_zoom_level: args.zoom,
        },
        map_search_results: search_result(&args.search)?,
        map_filter_options: args
            .filter
            .iter()
            .fold(MapFilterOptions::default(), |mut filter, option| {
                filter.set(*option, true);
                filter
            }),
    };

    Ok(MapController::mount(
        MapTarget {
            id: "cli".to_string(),
            size: MapSize::new(args.width, args.height),
        },
        props,
        MapDeps {
            source,
            analytics,
            config,
        },
        on_query_map,
    )?)
}

fn load_geojson(path: &Path) -> Result<StaticFeatureSource, Box<dyn std::error::Error>> {
    log::info!("Loading polling places from {}", path.display());
    Ok(StaticFeatureSource::from_geojson(&std::fs::read_to_string(
        path,
    )?)?)
}

fn search_result(args: &SearchArgs) -> Result<Option<MapSearchResult>, Box<dyn std::error::Error>> {
    let (Some(lon), Some(lat)) = (args.search_lon, args.search_lat) else {
        return Ok(None);
    };

    let extent = args
        .extent
        .as_deref()
        .map(<[f64; 4]>::try_from)
        .transpose()
        .map_err(|_| "--extent takes exactly four values")?;

    Ok(Some(MapSearchResult {
        lon,
        lat,
        formatted_address: args.address.clone(),
        extent,
    }))
}

/// Waits for the data layer and lands any fit animation the load started.
async fn settle(map: &mut MapController) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(DataStatus::Failed { message }) = map.settled().await {
        return Err(format!("Polling places failed to load: {message}").into());
    }
    map.finish_view_animation(true);
    Ok(())
}

fn print_map(map: &MapController) {
    let (lon, lat) = proj::to_wgs84(map.view().center());
    println!("Map '{}'", map.target().id);
    println!("  centre: {lon:.5}, {lat:.5} (zoom {:.1})", map.view().zoom());
    println!(
        "  layers: {}",
        map.layers()
            .roles()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    if let Some(overlay) = map.layers().search_overlay() {
        println!("  search: {}", overlay.label);
    }

    let Some(data) = map.layers().data() else {
        return;
    };

    let mut sprites: BTreeMap<String, usize> = BTreeMap::new();
    let mut hidden = 0;
    for feature in data.features() {
        match data.style().style(feature).sprite() {
            Some(sprite) => *sprites.entry(sprite.to_string()).or_default() += 1,
            None => hidden += 1,
        }
    }

    println!("  polling places: {}", data.features().len());
    println!("{:<20} COUNT", "  SPRITE");
    for (sprite, count) in &sprites {
        println!("  {sprite:<18} {count}");
    }
    if hidden > 0 {
        println!("  {:<18} {hidden}", "(filtered out)");
    }
}

fn print_feature(feature: &PollingPlaceFeature) {
    let food = feature
        .noms
        .as_ref()
        .map(Noms::food_description)
        .filter(|description| !description.is_empty())
        .unwrap_or_else(|| "no reports yet".to_string());

    println!(
        "{} - {}",
        feature.name().unwrap_or("(unnamed)"),
        feature.premises().unwrap_or_default()
    );
    if let Some(address) = feature.address() {
        println!("    {address}");
    }
    println!("    {food}");
}
