use indexmap::IndexMap;

/// Attribute name under which a feature's source element type is recorded.
pub const FEATURE_TYPE_KEY: &str = "featureType";

/// Feature attributes in document order.
// TODO support different value types besides String once the schema descriptions are used to
// type the attributes of decoded features.
pub type FeatureMap = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub geometry: Option<geo::Geometry>,
    pub attributes: FeatureMap,
}

impl From<geo::Geometry> for Feature {
    fn from(value: geo::Geometry) -> Self {
        Self {
            id: None,
            geometry: Some(value),
            attributes: FeatureMap::new(),
        }
    }
}

impl Feature {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn feature_type(&self) -> Option<&str> {
        self.get(FEATURE_TYPE_KEY)
    }

    pub fn set_feature_type(&mut self, feature_type: impl Into<String>) {
        self.set(FEATURE_TYPE_KEY, feature_type);
    }
}
