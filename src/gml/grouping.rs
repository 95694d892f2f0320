use indexmap::IndexMap;

use crate::geofile::feature::Feature;

/// Group key of features without a `featureType`.
pub const UNNAMED_TYPE: &str = "Unnamed Type";

/// Features by type, in order of first occurrence.
pub type FeatureGroups = IndexMap<String, Vec<Feature>>;

/// Partition features by their `featureType` attribute. Groups keep the order in which their
/// type first appears and each group keeps the input order of its features.
pub fn group_by_feature_type(features: Vec<Feature>) -> FeatureGroups {
    let mut groups = FeatureGroups::new();
    for feature in features {
        let feature_type = match feature.feature_type() {
            Some(feature_type) if !feature_type.is_empty() => feature_type.to_string(),
            _ => UNNAMED_TYPE.to_string(),
        };
        groups.entry(feature_type).or_default().push(feature);
    }
    groups
}
