use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::ProgressBar;
use serde::Serialize;

use crate::{
    geofile::{feature::Feature, geojson::write_features_to_geojson},
    gml::grouping::FeatureGroups,
};

/// A renderable vector layer holding the features of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    title: String,
    features: Vec<Feature>,
    visible: bool,
}

impl VectorLayer {
    /// Create a visible layer.
    pub fn new(title: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            title: title.into(),
            features,
            visible: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Flip visibility, returns the new state.
    pub fn toggle_visibility(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }
}

/// One layer per feature type, titled with the type name.
pub fn layers_from_groups(groups: FeatureGroups) -> Vec<VectorLayer> {
    groups
        .into_iter()
        .map(|(feature_type, features)| VectorLayer::new(feature_type, features))
        .collect()
}

/// The host mapping engine's layer collection.
pub trait LayerSink {
    /// Add all layers of one upload.
    fn add_layers(&mut self, layers: Vec<VectorLayer>) -> anyhow::Result<()>;
}

/// Layers held in memory, in the order they were added.
#[derive(Debug, Default)]
pub struct LayerCollection {
    layers: Vec<VectorLayer>,
}

impl LayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[VectorLayer] {
        &self.layers
    }

    pub fn get(&self, title: &str) -> Option<&VectorLayer> {
        self.layers.iter().find(|layer| layer.title() == title)
    }

    /// Toggle the first layer with the given title. Returns its new visibility, `None` if there
    /// is no such layer.
    pub fn toggle(&mut self, title: &str) -> Option<bool> {
        self.layers
            .iter_mut()
            .find(|layer| layer.title() == title)
            .map(VectorLayer::toggle_visibility)
    }
}

impl LayerSink for LayerCollection {
    fn add_layers(&mut self, layers: Vec<VectorLayer>) -> anyhow::Result<()> {
        self.layers.extend(layers);
        Ok(())
    }
}

/// Manifest name written next to the layer files.
pub const LAYER_MANIFEST_FILENAME: &str = "layers.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ManifestEntry {
    title: String,
    file: String,
    visible: bool,
    feature_count: usize,
}

/// Writes every layer as a GeoJSON file into a directory and keeps a YAML manifest of the layers
/// with their visibility, for a web map to load.
pub struct GeoJsonDirectory {
    output_dir: PathBuf,
    manifest: Vec<ManifestEntry>,
}

/// File stem for a layer title: characters outside `[A-Za-z0-9_-]` become `_`.
fn sanitize_title(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "layer".to_string()
    } else {
        stem
    }
}

impl GeoJsonDirectory {
    pub fn new(output_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Creating output directory {:?}", output_dir))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            manifest: Vec::new(),
        })
    }

    /// A file name not used by any layer in the manifest or in `pending`.
    fn unique_filename(&self, title: &str, pending: &[ManifestEntry]) -> String {
        let stem = sanitize_title(title);
        let is_taken = |filename: &str| {
            self.manifest
                .iter()
                .chain(pending)
                .any(|entry| entry.file == filename)
        };
        let mut filename = format!("{}.geojson", stem);
        let mut suffix = 2;
        while is_taken(&filename) {
            filename = format!("{}_{}.geojson", stem, suffix);
            suffix += 1;
        }
        filename
    }

    /// Remove the files of layers whose upload failed part way.
    fn remove_layer_files(&self, entries: &[ManifestEntry]) {
        for entry in entries {
            let filepath = self.output_dir.join(&entry.file);
            if let Err(e) = std::fs::remove_file(&filepath) {
                log::warn!("Could not remove {:?}: {}", filepath, e);
            }
        }
    }

    fn write_manifest(&self) -> anyhow::Result<()> {
        let manifest_filepath = self.output_dir.join(LAYER_MANIFEST_FILENAME);
        let contents = serde_yaml::to_string(&self.manifest)?;
        std::fs::write(&manifest_filepath, contents)
            .with_context(|| format!("Writing layer manifest {:?}", manifest_filepath))
    }
}

impl LayerSink for GeoJsonDirectory {
    fn add_layers(&mut self, layers: Vec<VectorLayer>) -> anyhow::Result<()> {
        if layers.is_empty() {
            return Ok(());
        }
        log::info!("Writing {} layers to {:?}", layers.len(), self.output_dir);
        let bar = ProgressBar::new(layers.len() as u64);
        let mut written = Vec::with_capacity(layers.len());
        for layer in &layers {
            let filename = self.unique_filename(layer.title(), &written);
            let output_filepath = self.output_dir.join(&filename);
            log::debug!(
                "Writing {} features of layer '{}' to {:?}",
                layer.features().len(),
                layer.title(),
                output_filepath
            );
            if let Err(e) = write_features_to_geojson(layer.features(), &output_filepath) {
                bar.abandon();
                self.remove_layer_files(&written);
                return Err(e).with_context(|| format!("Writing layer '{}'", layer.title()));
            }
            written.push(ManifestEntry {
                title: layer.title().to_string(),
                file: filename,
                visible: layer.is_visible(),
                feature_count: layer.features().len(),
            });
            bar.inc(1);
        }
        bar.finish_and_clear();
        self.manifest.extend(written);
        self.write_manifest()
    }
}
