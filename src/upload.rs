use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    crs::crs_registry::CrsPair,
    gml::{
        dialect::DialectSetting, error::GmlError, grouping::group_by_feature_type,
        reader::decode_features,
    },
    layers::{layers_from_groups, LayerSink, VectorLayer},
    xsd::{
        description::{table_to_yaml, SchemaDescriptionTable},
        error::SchemaError,
        extractor::{extract_type_descriptions_with_options, ExtractOptions},
    },
};

/// Kind of an uploaded file, by suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Gml,
    Xsd,
}

impl UploadKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "gml" => Some(UploadKind::Gml),
            "xsd" => Some(UploadKind::Xsd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub dialect: DialectSetting,
    pub crs: CrsPair,
    pub extract: ExtractOptions,
    /// Where schema descriptions are dumped as YAML, if anywhere.
    pub schema_output_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dialect: DialectSetting::default(),
            crs: CrsPair::fixed(),
            extract: ExtractOptions::default(),
            schema_output_dir: None,
        }
    }
}

/// Decode a GML document into one layer per feature type. Nothing is returned unless the whole
/// document decodes.
pub fn load_gml(gml_text: &str, config: &IngestConfig) -> Result<Vec<VectorLayer>, GmlError> {
    let dialect = config.dialect.resolve(gml_text);
    log::info!("Reading GML as {}", dialect.name());
    let features = decode_features(gml_text, dialect, &config.crs)?;
    let groups = group_by_feature_type(features);
    for (feature_type, features) in &groups {
        log::info!("Feature type '{}': {} features", feature_type, features.len());
    }
    Ok(layers_from_groups(groups))
}

/// Describe a schema and log the description.
pub fn load_xsd(
    xsd_text: &str,
    options: &ExtractOptions,
) -> Result<SchemaDescriptionTable, SchemaError> {
    let table = extract_type_descriptions_with_options(xsd_text, options)?;
    match table_to_yaml(&table) {
        Ok(yaml) => log::info!("Parsed XSD descriptions ({} entries):\n{}", table.len(), yaml),
        Err(err) => log::warn!("Could not render XSD descriptions: {}", err),
    }
    Ok(table)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub gml_uploads: usize,
    pub layers_added: usize,
    pub schemas_described: usize,
    pub failed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl IngestSummary {
    /// Whether uploads were attempted and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        !self.failed.is_empty() && self.gml_uploads == 0 && self.schemas_described == 0
    }
}

fn write_schema_description(
    table: &SchemaDescriptionTable,
    xsd_filepath: &Path,
    output_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let stem = xsd_filepath
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("schema");
    let output_filepath = output_dir.join(format!("{}.schema.yaml", stem));
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(&output_filepath, table_to_yaml(table)?)
        .with_context(|| format!("Writing schema description {:?}", output_filepath))?;
    Ok(output_filepath)
}

/// Run every file through its loader, one upload at a time.
///
/// A GML upload's layers reach the sink in a single `add_layers` call, and only if the whole
/// document decoded. A failed upload is logged and recorded in the summary, the remaining files
/// are still processed. Errors of the sink itself abort.
pub fn ingest_files(
    paths: &[PathBuf],
    config: &IngestConfig,
    sink: &mut dyn LayerSink,
) -> anyhow::Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    for path in paths {
        let Some(kind) = UploadKind::from_path(path) else {
            log::warn!("Skipping {:?}, expected a .gml or .xsd file", path);
            summary.skipped.push(path.clone());
            continue;
        };
        let text = match read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                log::error!("Could not read {:?}: {}", path, err);
                summary.failed.push(path.clone());
                continue;
            }
        };
        match kind {
            UploadKind::Gml => match load_gml(&text, config) {
                Ok(layers) => {
                    let num_layers = layers.len();
                    sink.add_layers(layers)
                        .with_context(|| format!("Adding layers from {:?}", path))?;
                    summary.gml_uploads += 1;
                    summary.layers_added += num_layers;
                }
                Err(err) => {
                    log::error!("Error parsing GML {:?}: {}", path, err);
                    summary.failed.push(path.clone());
                }
            },
            UploadKind::Xsd => match load_xsd(&text, &config.extract) {
                Ok(table) => {
                    if let Some(output_dir) = &config.schema_output_dir {
                        let output_filepath = write_schema_description(&table, path, output_dir)?;
                        log::info!("Wrote schema description to {:?}", output_filepath);
                    }
                    summary.schemas_described += 1;
                }
                Err(err) => {
                    log::error!("Error parsing XSD {:?}: {}", path, err);
                    summary.failed.push(path.clone());
                }
            },
        }
    }
    Ok(summary)
}
