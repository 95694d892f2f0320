use std::sync::OnceLock;

use indexmap::IndexMap;
use thiserror::Error;

use super::crs_utils::{epsg_code_to_authority_string, parse_epsg_code, EpsgCode};

/// A coordinate reference system known to the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrsDefinition {
    pub code: EpsgCode,
    pub name: &'static str,
    /// PROJ string handed to the mapping engine when it sets up its own projection.
    pub proj_definition: &'static str,
}

impl CrsDefinition {
    pub fn authority_string(&self) -> String {
        epsg_code_to_authority_string(self.code)
    }
}

/// The fixed working system: both uploaded documents and the map view use it.
pub const ETRS89_UTM_ZONE_32N: CrsDefinition = CrsDefinition {
    code: 25832,
    name: "ETRS89 / UTM zone 32N",
    proj_definition: "+proj=utm +zone=32 +datum=WGS84 +units=m +no_defs +axis=enu",
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrsError {
    #[error("'{0}' is not an EPSG CRS identifier")]
    Unrecognised(String),
    #[error("{0} is not a registered CRS")]
    NotRegistered(String),
}

#[derive(Debug)]
pub struct CrsRegistry {
    definitions: IndexMap<EpsgCode, CrsDefinition>,
}

static DEFAULT_REGISTRY: OnceLock<CrsRegistry> = OnceLock::new();

/// Register the working CRS. Safe to call any number of times; only the first call builds the
/// registry and every call returns the same instance.
pub fn register_default_crs() -> &'static CrsRegistry {
    DEFAULT_REGISTRY.get_or_init(|| {
        log::debug!(
            "Registering {} ({})",
            ETRS89_UTM_ZONE_32N.authority_string(),
            ETRS89_UTM_ZONE_32N.name
        );
        CrsRegistry::new([ETRS89_UTM_ZONE_32N])
    })
}

impl CrsRegistry {
    pub fn new(definitions: impl IntoIterator<Item = CrsDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|definition| (definition.code, definition))
                .collect(),
        }
    }

    /// Look up a CRS by any of its identifier spellings, see `parse_epsg_code`.
    pub fn resolve(&self, identifier: &str) -> Result<&CrsDefinition, CrsError> {
        let code = parse_epsg_code(identifier)
            .ok_or_else(|| CrsError::Unrecognised(identifier.to_string()))?;
        self.definitions
            .get(&code)
            .ok_or_else(|| CrsError::NotRegistered(epsg_code_to_authority_string(code)))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CrsDefinition> {
        self.definitions.values()
    }
}

/// The reference system features should end up in and the one the document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrsPair {
    pub feature_crs: CrsDefinition,
    pub data_crs: CrsDefinition,
}

impl CrsPair {
    pub fn resolve(
        registry: &CrsRegistry,
        feature_crs: &str,
        data_crs: &str,
    ) -> Result<Self, CrsError> {
        Ok(Self {
            feature_crs: *registry.resolve(feature_crs)?,
            data_crs: *registry.resolve(data_crs)?,
        })
    }

    /// Both sides in the working system.
    pub fn fixed() -> Self {
        Self {
            feature_crs: ETRS89_UTM_ZONE_32N,
            data_crs: ETRS89_UTM_ZONE_32N,
        }
    }

    pub fn is_same_system(&self) -> bool {
        self.feature_crs.code == self.data_crs.code
    }
}
