extern crate log;
pub mod config;
pub mod crs;
pub mod geofile;
pub mod gml;
pub mod layers;
pub mod upload;
pub mod xml_utils;
pub mod xsd;
use crate::config::Config;
use crate::crs::crs_registry::register_default_crs;
use crate::layers::{GeoJsonDirectory, LayerCollection, LayerSink};
use crate::upload::ingest_files;
use anyhow::anyhow;
use clap::Parser;
use std::path::Path;

/// Load GML documents into one GeoJSON layer per feature type and describe XML schemas.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,

    /// Decode and describe the inputs without writing any layers.
    #[arg(long)]
    dry_run: bool,
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(Path::new(&args.config_filepath))?;

    let registry = register_default_crs();
    for definition in registry.definitions() {
        log::debug!("{}: {}", definition.authority_string(), definition.proj_definition);
    }
    let ingest_config = config.ingest_config(registry)?;
    log::info!(
        "Reading {} input files in {}",
        config.inputs.len(),
        ingest_config.crs.data_crs.authority_string()
    );

    let mut dry_run_layers = LayerCollection::new();
    let mut layer_directory;
    let sink: &mut dyn LayerSink = if args.dry_run {
        &mut dry_run_layers
    } else {
        layer_directory = GeoJsonDirectory::new(&config.output_dir)?;
        &mut layer_directory
    };
    let summary = ingest_files(&config.inputs, &ingest_config, sink)?;
    for layer in dry_run_layers.layers() {
        log::info!(
            "Layer '{}' with {} features",
            layer.title(),
            layer.features().len()
        );
    }
    log::info!(
        "Added {} layers from {} GML uploads, described {} schemas, {} failed, {} skipped",
        summary.layers_added,
        summary.gml_uploads,
        summary.schemas_described,
        summary.failed.len(),
        summary.skipped.len()
    );
    if summary.all_failed() {
        return Err(anyhow!("None of the {} uploads succeeded", summary.failed.len()));
    }
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
