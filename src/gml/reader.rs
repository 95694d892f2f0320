use roxmltree::Node;

use crate::{
    crs::{
        crs_registry::{CrsDefinition, CrsPair},
        crs_utils::parse_epsg_code,
    },
    geofile::feature::Feature,
    xml_utils::{parse_xml, text_content},
};

use super::{dialect::GmlDialect, error::GmlError, geometry::read_geometry};

/// A feature together with the local name of the element it was read from.
struct DecodedFeature {
    element_name: String,
    feature: Feature,
}

/// Decode a GML document into features.
///
/// Every feature is stamped with its element's local name under `featureType`, whichever grammar
/// read it. Any error aborts the whole document.
pub fn decode_features(
    raw_text: &str,
    dialect: GmlDialect,
    crs: &CrsPair,
) -> Result<Vec<Feature>, GmlError> {
    if !crs.is_same_system() {
        return Err(GmlError::CrsMismatch {
            feature_crs: crs.feature_crs.authority_string(),
            data_crs: crs.data_crs.authority_string(),
        });
    }
    let document = parse_xml(raw_text)?;
    let reader = FeatureReader {
        dialect,
        data_crs: &crs.data_crs,
    };
    let decoded = reader.read_features(document.root_element())?;
    log::debug!(
        "Decoded {} features with the {} grammar",
        decoded.len(),
        dialect.name()
    );
    Ok(stamp_feature_type(decoded))
}

fn stamp_feature_type(decoded: Vec<DecodedFeature>) -> Vec<Feature> {
    decoded
        .into_iter()
        .map(|DecodedFeature { element_name, mut feature }| {
            feature.set_feature_type(element_name);
            feature
        })
        .collect()
}

fn is_feature_collection(node: &Node) -> bool {
    node.tag_name().name().ends_with("FeatureCollection")
}

/// Feature elements of a document: the members of a collection (nested collections included), or
/// the element itself when it holds no members.
fn feature_elements<'a, 'input: 'a>(container: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    let mut elements = Vec::new();
    let mut is_container = is_feature_collection(&container);
    for property in container.children().filter(|child| child.is_element()) {
        match property.tag_name().name() {
            "featureMember" | "featureMembers" | "member" => {
                is_container = true;
                for member in property.children().filter(|child| child.is_element()) {
                    if is_feature_collection(&member) {
                        elements.extend(feature_elements(member));
                    } else {
                        elements.push(member);
                    }
                }
            }
            _ => {}
        }
    }
    if !is_container {
        elements.push(container);
    }
    elements
}

struct FeatureReader<'c> {
    dialect: GmlDialect,
    data_crs: &'c CrsDefinition,
}

impl<'c> FeatureReader<'c> {
    fn read_features(&self, root: Node) -> Result<Vec<DecodedFeature>, GmlError> {
        feature_elements(root)
            .into_iter()
            .map(|element| {
                Ok(DecodedFeature {
                    element_name: element.tag_name().name().to_string(),
                    feature: self.read_feature(element)?,
                })
            })
            .collect()
    }

    fn read_feature(&self, element: Node) -> Result<Feature, GmlError> {
        let mut feature = Feature {
            id: element
                .attribute((self.dialect.namespace(), "id"))
                .or_else(|| element.attribute("fid"))
                .map(str::to_string),
            ..Default::default()
        };
        for property in element.children().filter(|child| child.is_element()) {
            let name = property.tag_name().name();
            if name == "boundedBy" && self.dialect.is_gml_element(&property) {
                continue;
            }
            match self.read_geometry_property(property)? {
                Some(geometry) if feature.geometry.is_none() => feature.geometry = Some(geometry),
                Some(_) => log::debug!(
                    "Skipping additional geometry property '{}' of feature {:?}",
                    name,
                    feature.id
                ),
                None => feature.set(name, text_content(property)),
            }
        }
        Ok(feature)
    }

    /// The geometry held by a property element, if it holds one.
    fn read_geometry_property(&self, property: Node) -> Result<Option<geo::Geometry>, GmlError> {
        for child in property.children().filter(|child| child.is_element()) {
            if let Some(geometry) = read_geometry(child, self.dialect)? {
                self.check_srs_name(child);
                return Ok(Some(geometry));
            }
        }
        Ok(None)
    }

    fn check_srs_name(&self, geometry: Node) {
        let Some(srs_name) = geometry.attribute("srsName") else {
            return;
        };
        match parse_epsg_code(srs_name) {
            Some(code) if code == self.data_crs.code => {}
            Some(_) => log::warn!(
                "Geometry declares srsName {} but is read as {}, coordinates are not reprojected",
                srs_name,
                self.data_crs.authority_string()
            ),
            None => log::debug!("Unrecognised srsName {}", srs_name),
        }
    }
}
