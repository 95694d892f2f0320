use std::{fs, io, path::Path};

use rayon::prelude::*;

use super::feature::Feature;

pub fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    let properties: geojson::JsonObject = feature
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), geojson::JsonValue::String(value.clone())))
        .collect();
    geojson::Feature {
        bbox: None,
        geometry: feature
            .geometry
            .as_ref()
            .map(|geometry| geojson::Geometry::new(geojson::Value::from(geometry))),
        id: feature.id.clone().map(geojson::feature::Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn features_to_feature_collection(features: &[Feature]) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: features.par_iter().map(feature_to_geojson).collect(),
        foreign_members: None,
    }
}

pub fn write_features_to_geojson(features: &[Feature], output_filepath: &Path) -> io::Result<()> {
    let geojson_contents =
        geojson::GeoJson::from(features_to_feature_collection(features)).to_string();
    fs::write(output_filepath, geojson_contents)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use testdir::testdir;

    use crate::geofile::feature::Feature;

    use super::{feature_to_geojson, write_features_to_geojson};

    fn road() -> Feature {
        let mut feature = Feature::from(geo::Geometry::LineString(
            vec![(600000.0, 6225000.0), (600100.0, 6225050.0)].into(),
        ));
        feature.id = Some("road.1".to_string());
        feature.set("name", "Ring 3");
        feature.set_feature_type("Road");
        feature
    }

    #[test]
    fn test_feature_to_geojson() {
        let geojson_feature = feature_to_geojson(&road());

        assert_eq!(
            Some(geojson::feature::Id::String("road.1".to_string())),
            geojson_feature.id
        );
        assert_eq!(
            Some(&geojson::JsonValue::String("Road".to_string())),
            geojson_feature.property("featureType")
        );
        let geometry = geojson_feature.geometry.unwrap();
        assert_eq!(
            geojson::Value::LineString(vec![vec![600000.0, 6225000.0], vec![600100.0, 6225050.0]]),
            geometry.value
        );
    }

    #[test]
    fn test_feature_without_geometry() {
        let mut feature = Feature::default();
        feature.set("note", "no geometry");
        let geojson_feature = feature_to_geojson(&feature);
        assert!(geojson_feature.geometry.is_none());
        assert!(geojson_feature.id.is_none());
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    fn test_write_features_to_geojson(#[case] num_features: usize) {
        let features: Vec<Feature> = (0..num_features).map(|_| road()).collect();
        let output_filepath = testdir!().join("roads.geojson");

        write_features_to_geojson(&features, &output_filepath).unwrap();

        let contents = std::fs::read_to_string(&output_filepath).unwrap();
        let collection: geojson::FeatureCollection = contents.parse::<geojson::GeoJson>()
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(num_features, collection.features.len());
    }
}
