pub type EpsgCode = u32;

pub fn epsg_code_to_authority_string(code: EpsgCode) -> String {
    format!("EPSG:{}", code)
}

/// Extract the EPSG code from a CRS identifier.
///
/// Accepts the spellings found in the `srsName` attributes of GML documents, e.g.
/// - `EPSG:25832`
/// - `urn:ogc:def:crs:EPSG::25832` and `urn:ogc:def:crs:EPSG:6.9:25832`
/// - `http://www.opengis.net/def/crs/EPSG/0/25832`
/// - `http://www.opengis.net/gml/srs/epsg.xml#25832`
///
/// # Returns
/// `None` if the identifier does not name an EPSG authority or has no trailing code.
pub fn parse_epsg_code(identifier: &str) -> Option<EpsgCode> {
    let identifier = identifier.trim();
    if !identifier.to_ascii_lowercase().contains("epsg") {
        return None;
    }
    identifier
        .rsplit(|c: char| c == ':' || c == '/' || c == '#')
        .next()
        .and_then(|code| code.parse().ok())
}
