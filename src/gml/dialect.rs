use roxmltree::Node;
use serde::Deserialize;

pub const GML32_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";
/// Shared by GML 2, 3.0 and 3.1.
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml";

/// Marker for 3.2 documents that reference the schema location rather than declaring the
/// namespace, e.g. `http://schemas.opengis.net/gml/3.2.1/gml.xsd`.
const GML32_MARKER: &str = "gml/3.2";

/// Grammar used to decode a GML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GmlDialect {
    Gml32,
    /// GML 3.0/3.1, also reads GML 2 geometry encodings.
    Gml3,
}

impl GmlDialect {
    pub fn name(&self) -> &'static str {
        match self {
            GmlDialect::Gml32 => "GML 3.2",
            GmlDialect::Gml3 => "GML 3",
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            GmlDialect::Gml32 => GML32_NAMESPACE,
            GmlDialect::Gml3 => GML_NAMESPACE,
        }
    }

    /// Whether `node` is an element of this dialect's GML namespace.
    pub fn is_gml_element(&self, node: &Node) -> bool {
        node.is_element() && node.tag_name().namespace() == Some(self.namespace())
    }
}

/// Pick the grammar for a document by scanning its text. Never fails: anything without a 3.2
/// marker is read with the generic grammar.
pub fn classify_dialect(raw_text: &str) -> GmlDialect {
    if raw_text.contains(GML32_NAMESPACE) || raw_text.contains(GML32_MARKER) {
        GmlDialect::Gml32
    } else {
        GmlDialect::Gml3
    }
}

/// Configured dialect, `Auto` classifies each document.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialectSetting {
    #[default]
    Auto,
    Gml32,
    Gml3,
}

impl DialectSetting {
    pub fn resolve(&self, raw_text: &str) -> GmlDialect {
        match self {
            DialectSetting::Auto => classify_dialect(raw_text),
            DialectSetting::Gml32 => GmlDialect::Gml32,
            DialectSetting::Gml3 => GmlDialect::Gml3,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{classify_dialect, DialectSetting, GmlDialect};

    #[rstest]
    #[case(
        r#"<wfs:FeatureCollection xmlns:gml="http://www.opengis.net/gml/3.2"/>"#,
        GmlDialect::Gml32
    )]
    #[case(
        r#"<FeatureCollection xsi:schemaLocation="http://schemas.opengis.net/gml/3.2.1/gml.xsd"/>"#,
        GmlDialect::Gml32
    )]
    #[case(
        r#"<gml:FeatureCollection xmlns:gml="http://www.opengis.net/gml"/>"#,
        GmlDialect::Gml3
    )]
    #[case("<FeatureCollection/>", GmlDialect::Gml3)]
    #[case("", GmlDialect::Gml3)]
    // The namespace is only reachable through an entity, which the scan does not expand.
    #[case(
        r#"<!DOCTYPE c [<!ENTITY ns "http://www.opengis.net/gml/3.&#50;">]><c xmlns:gml="&ns;"/>"#,
        GmlDialect::Gml3
    )]
    fn test_classify_dialect(#[case] raw_text: &str, #[case] expected: GmlDialect) {
        assert_eq!(expected, classify_dialect(raw_text));
    }

    #[test]
    fn test_dialect_setting_overrides_classification() {
        let gml32 = r#"<c xmlns:gml="http://www.opengis.net/gml/3.2"/>"#;
        assert_eq!(GmlDialect::Gml32, DialectSetting::Auto.resolve(gml32));
        assert_eq!(GmlDialect::Gml3, DialectSetting::Gml3.resolve(gml32));
        assert_eq!(GmlDialect::Gml32, DialectSetting::Gml32.resolve("<c/>"));
    }

    #[test]
    fn test_dialect_setting_from_yaml() {
        let setting: DialectSetting = serde_yaml::from_str("gml32").unwrap();
        assert_eq!(DialectSetting::Gml32, setting);
    }
}
