use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::{
    crs::{
        crs_registry::{CrsPair, CrsRegistry, ETRS89_UTM_ZONE_32N},
        crs_utils::epsg_code_to_authority_string,
    },
    gml::dialect::DialectSetting,
    upload::IngestConfig,
    xsd::extractor::{ElementScope, ExtractOptions},
};

fn default_crs() -> String {
    epsg_code_to_authority_string(ETRS89_UTM_ZONE_32N.code)
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CrsConfig {
    #[serde(default = "default_crs")]
    pub feature_crs: String,
    #[serde(default = "default_crs")]
    pub data_crs: String,
}

impl Default for CrsConfig {
    fn default() -> Self {
        Self {
            feature_crs: default_crs(),
            data_crs: default_crs(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Files to upload, `.gml` and `.xsd`. Relative paths are relative to the config file.
    pub inputs: Vec<PathBuf>,
    #[serde(default = "Config::default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub dialect: DialectSetting,
    #[serde(default)]
    pub crs: CrsConfig,
    #[serde(default)]
    pub element_scope: ElementScope,
    /// Also write schema descriptions to `output_dir`.
    #[serde(default)]
    pub write_schema_descriptions: bool,
}

impl Config {
    fn default_output_dir() -> PathBuf {
        PathBuf::from("layers")
    }

    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Read a config file, resolving relative paths against its directory.
    pub fn load(config_filepath: &Path) -> anyhow::Result<Self> {
        if !config_filepath.exists() {
            return Err(anyhow!("Config file {:?} not found", config_filepath));
        }
        let contents = read_to_string(config_filepath)
            .with_context(|| format!("Reading config file {:?}", config_filepath))?;
        let mut config = Self::from_yaml_str(&contents)
            .with_context(|| format!("Parsing config file {:?}", config_filepath))?;
        if let Some(base_dir) = config_filepath.parent() {
            config.resolve_relative_to(base_dir);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base_dir: &Path) {
        let resolve = |path: &PathBuf| {
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path.clone()
            }
        };
        self.inputs = self.inputs.iter().map(resolve).collect();
        self.output_dir = resolve(&self.output_dir);
    }

    pub fn ingest_config(&self, registry: &CrsRegistry) -> anyhow::Result<IngestConfig> {
        let crs = CrsPair::resolve(registry, &self.crs.feature_crs, &self.crs.data_crs)
            .context("Resolving the configured CRS")?;
        Ok(IngestConfig {
            dialect: self.dialect,
            crs,
            extract: ExtractOptions {
                element_scope: self.element_scope,
            },
            schema_output_dir: self
                .write_schema_descriptions
                .then(|| self.output_dir.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use testdir::testdir;

    use crate::{
        crs::crs_registry::{register_default_crs, CrsPair},
        gml::dialect::DialectSetting,
        xsd::extractor::ElementScope,
    };

    use super::{Config, CrsConfig};

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_yaml_str("inputs: [roads.gml]").unwrap();

        assert_eq!(vec![PathBuf::from("roads.gml")], config.inputs);
        assert_eq!(PathBuf::from("layers"), config.output_dir);
        assert_eq!(DialectSetting::Auto, config.dialect);
        assert_eq!(CrsConfig::default(), config.crs);
        assert_eq!(ElementScope::AllDeclarations, config.element_scope);

        let ingest_config = config.ingest_config(register_default_crs()).unwrap();
        assert_eq!(CrsPair::fixed(), ingest_config.crs);
        assert_eq!(None, ingest_config.schema_output_dir);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_yaml_str(
            r#"
inputs:
  - data/roads.gml
  - /abs/roads.xsd
output_dir: out
dialect: gml3
crs:
  data_crs: urn:ogc:def:crs:EPSG::25832
element_scope: top_level
write_schema_descriptions: true
"#,
        )
        .unwrap();

        assert_eq!(DialectSetting::Gml3, config.dialect);
        assert_eq!("EPSG:25832", config.crs.feature_crs);
        assert_eq!(ElementScope::TopLevel, config.element_scope);

        let ingest_config = config.ingest_config(register_default_crs()).unwrap();
        assert_eq!(Some(PathBuf::from("out")), ingest_config.schema_output_dir);
        assert_eq!(ElementScope::TopLevel, ingest_config.extract.element_scope);
    }

    #[test]
    fn test_unregistered_crs_is_rejected() {
        let config = Config::from_yaml_str("inputs: []\ncrs: {data_crs: 'EPSG:4326'}").unwrap();
        assert!(config.ingest_config(register_default_crs()).is_err());
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        assert!(Config::from_yaml_str("inputs: []\ndialect: gml4").is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = testdir!();
        let config_filepath = dir.join("config.yaml");
        std::fs::write(&config_filepath, "inputs: [roads.gml, /abs/roads.xsd]").unwrap();

        let config = Config::load(&config_filepath).unwrap();

        assert_eq!(
            vec![dir.join("roads.gml"), PathBuf::from("/abs/roads.xsd")],
            config.inputs
        );
        assert_eq!(dir.join("layers"), config.output_dir);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(&testdir!().join("missing.yaml")).is_err());
    }
}
