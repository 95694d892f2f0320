//! GML geometry grammar.
//!
//! Reads the geometry elements of the GML 2, 3.x and 3.2 simple-feature vocabulary into `geo`
//! geometries. Only elements of the dialect's namespace are recognised, so a 3.2 geometry read
//! with the generic grammar is not a geometry at all.
//!
//! Coordinates are taken in the axis order they are written in, the working CRS is
//! easting/northing.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use roxmltree::Node;

use crate::xml_utils::text_content;

use super::{dialect::GmlDialect, error::GmlError};

const DEFAULT_SRS_DIMENSION: usize = 2;

/// Read `node` as a geometry.
///
/// # Returns
/// `Ok(None)` if `node` is not a geometry element of the dialect, an error if it is one but its
/// content cannot be decoded.
pub fn read_geometry(node: Node, dialect: GmlDialect) -> Result<Option<Geometry>, GmlError> {
    if !dialect.is_gml_element(&node) {
        return Ok(None);
    }
    let geometry = match node.tag_name().name() {
        "Point" => Geometry::Point(read_point(node, dialect)?),
        "LineString" | "LinearRing" | "Curve" => Geometry::LineString(read_line(node, dialect)?),
        "Polygon" => Geometry::Polygon(read_polygon(node, dialect)?),
        "Surface" => {
            let mut polygons = read_surface(node, dialect)?;
            if polygons.len() == 1 {
                Geometry::Polygon(polygons.remove(0))
            } else {
                Geometry::MultiPolygon(MultiPolygon(polygons))
            }
        }
        "MultiPoint" => Geometry::MultiPoint(read_multi_point(node, dialect)?),
        "MultiLineString" | "MultiCurve" => {
            Geometry::MultiLineString(read_multi_line(node, dialect)?)
        }
        "MultiPolygon" | "MultiSurface" => {
            Geometry::MultiPolygon(read_multi_polygon(node, dialect)?)
        }
        "Envelope" | "Box" => Geometry::Polygon(read_envelope(node, dialect)?),
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

fn invalid_geometry(node: Node, reason: impl Into<String>) -> GmlError {
    GmlError::InvalidGeometry {
        element: node.tag_name().name().to_string(),
        reason: reason.into(),
    }
}

fn invalid_coordinates(node: Node, reason: impl Into<String>) -> GmlError {
    GmlError::InvalidCoordinates {
        element: node.tag_name().name().to_string(),
        reason: reason.into(),
    }
}

fn gml_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    dialect: GmlDialect,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| dialect.is_gml_element(child) && child.tag_name().name() == name)
}

fn first_gml_child<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    dialect: GmlDialect,
    name: &'static str,
) -> Option<Node<'a, 'input>> {
    gml_children(node, dialect, name).next()
}

fn parse_ordinate(node: Node, value: &str) -> Result<f64, GmlError> {
    value
        .parse()
        .map_err(|_| invalid_coordinates(node, format!("'{}' is not a number", value)))
}

fn parse_ordinates(node: Node) -> Result<Vec<f64>, GmlError> {
    text_content(node)
        .split_whitespace()
        .map(|value| parse_ordinate(node, value))
        .collect()
}

/// `srsDimension` of the nearest element that declares it, 2 if none does.
fn srs_dimension(node: Node) -> Result<usize, GmlError> {
    match node
        .ancestors()
        .find_map(|ancestor| ancestor.attribute("srsDimension"))
    {
        Some(value) => match value.trim().parse::<usize>() {
            Ok(dimension) if dimension >= 2 => Ok(dimension),
            _ => Err(invalid_coordinates(
                node,
                format!("unsupported srsDimension '{}'", value),
            )),
        },
        None => Ok(DEFAULT_SRS_DIMENSION),
    }
}

fn parse_pos(node: Node) -> Result<Coord, GmlError> {
    let ordinates = parse_ordinates(node)?;
    if ordinates.len() < 2 {
        return Err(invalid_coordinates(
            node,
            format!("expected at least 2 ordinates, found {}", ordinates.len()),
        ));
    }
    Ok(Coord {
        x: ordinates[0],
        y: ordinates[1],
    })
}

fn parse_pos_list(node: Node) -> Result<Vec<Coord>, GmlError> {
    let dimension = srs_dimension(node)?;
    let ordinates = parse_ordinates(node)?;
    if ordinates.len() % dimension != 0 {
        return Err(invalid_coordinates(
            node,
            format!(
                "{} ordinates cannot be split into {}-dimensional positions",
                ordinates.len(),
                dimension
            ),
        ));
    }
    Ok(ordinates
        .chunks(dimension)
        .map(|position| Coord {
            x: position[0],
            y: position[1],
        })
        .collect())
}

/// GML 2 `<coordinates>` with its `cs` (coordinate), `ts` (tuple) and `decimal` separators.
fn parse_coordinates(node: Node) -> Result<Vec<Coord>, GmlError> {
    let coordinate_separator = node.attribute("cs").unwrap_or(",");
    let tuple_separator = node.attribute("ts").unwrap_or(" ");
    let decimal = node.attribute("decimal").unwrap_or(".");

    let text = text_content(node);
    let tuples: Vec<&str> = if tuple_separator.trim().is_empty() {
        text.split_whitespace().collect()
    } else {
        text.split(tuple_separator)
            .map(str::trim)
            .filter(|tuple| !tuple.is_empty())
            .collect()
    };

    tuples
        .into_iter()
        .map(|tuple| {
            let ordinates = tuple
                .split(coordinate_separator)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| parse_ordinate(node, &value.replace(decimal, ".")))
                .collect::<Result<Vec<f64>, GmlError>>()?;
            if ordinates.len() < 2 {
                return Err(invalid_coordinates(
                    node,
                    format!("tuple '{}' has fewer than 2 ordinates", tuple),
                ));
            }
            Ok(Coord {
                x: ordinates[0],
                y: ordinates[1],
            })
        })
        .collect()
}

/// GML 2 `<coord><X/><Y/></coord>`.
fn parse_coord(node: Node, dialect: GmlDialect) -> Result<Coord, GmlError> {
    let ordinate = |name: &'static str| -> Result<f64, GmlError> {
        let element = first_gml_child(node, dialect, name)
            .ok_or_else(|| invalid_coordinates(node, format!("missing <{}>", name)))?;
        parse_ordinate(node, &text_content(element))
    };
    Ok(Coord {
        x: ordinate("X")?,
        y: ordinate("Y")?,
    })
}

/// Coordinates of a geometry element, in whichever encoding it uses.
fn read_coords(node: Node, dialect: GmlDialect) -> Result<Vec<Coord>, GmlError> {
    if let Some(pos_list) = first_gml_child(node, dialect, "posList") {
        return parse_pos_list(pos_list);
    }
    let positions: Vec<Node> = gml_children(node, dialect, "pos").collect();
    if !positions.is_empty() {
        return positions.into_iter().map(parse_pos).collect();
    }
    if let Some(coordinates) = first_gml_child(node, dialect, "coordinates") {
        return parse_coordinates(coordinates);
    }
    let coords: Vec<Node> = gml_children(node, dialect, "coord").collect();
    if !coords.is_empty() {
        return coords
            .into_iter()
            .map(|coord| parse_coord(coord, dialect))
            .collect();
    }
    Err(invalid_geometry(node, "no coordinates"))
}

fn read_point(node: Node, dialect: GmlDialect) -> Result<Point, GmlError> {
    read_coords(node, dialect)?
        .first()
        .map(|coord| Point::from(*coord))
        .ok_or_else(|| invalid_geometry(node, "empty position"))
}

fn read_line(node: Node, dialect: GmlDialect) -> Result<LineString, GmlError> {
    let coords = if node.tag_name().name() == "Curve" {
        read_curve(node, dialect)?
    } else {
        read_coords(node, dialect)?
    };
    if coords.is_empty() {
        return Err(invalid_geometry(node, "empty coordinate list"));
    }
    Ok(LineString::new(coords))
}

/// Append `coords` to `line`, dropping the first one if it repeats the current end point.
fn append_joined(line: &mut Vec<Coord>, coords: Vec<Coord>) {
    let mut coords = coords.into_iter().peekable();
    if let (Some(last), Some(first)) = (line.last(), coords.peek()) {
        if last == first {
            coords.next();
        }
    }
    line.extend(coords);
}

fn read_curve(node: Node, dialect: GmlDialect) -> Result<Vec<Coord>, GmlError> {
    let segments = first_gml_child(node, dialect, "segments")
        .ok_or_else(|| invalid_geometry(node, "missing <segments>"))?;
    let mut coords = Vec::new();
    for segment in segments.children().filter(|child| dialect.is_gml_element(child)) {
        append_joined(&mut coords, read_coords(segment, dialect)?);
    }
    Ok(coords)
}

/// Read the ring inside an `exterior`/`interior` (or GML 2 `outerBoundaryIs`/`innerBoundaryIs`)
/// element.
fn read_ring(boundary: Node, dialect: GmlDialect) -> Result<LineString, GmlError> {
    let ring = boundary
        .children()
        .find(|child| dialect.is_gml_element(child))
        .ok_or_else(|| invalid_geometry(boundary, "missing ring"))?;
    match ring.tag_name().name() {
        "LinearRing" => Ok(LineString::new(read_coords(ring, dialect)?)),
        "Ring" => {
            let mut coords = Vec::new();
            for member in gml_children(ring, dialect, "curveMember") {
                for curve in member.children().filter(|child| child.is_element()) {
                    append_joined(&mut coords, read_line(curve, dialect)?.0);
                }
            }
            Ok(LineString::new(coords))
        }
        other => Err(invalid_geometry(
            boundary,
            format!("unsupported ring <{}>", other),
        )),
    }
}

/// Read a `Polygon` or `PolygonPatch`.
fn read_polygon(node: Node, dialect: GmlDialect) -> Result<Polygon, GmlError> {
    let exterior = first_gml_child(node, dialect, "exterior")
        .or_else(|| first_gml_child(node, dialect, "outerBoundaryIs"))
        .ok_or_else(|| invalid_geometry(node, "missing exterior ring"))?;
    let interiors = gml_children(node, dialect, "interior")
        .chain(gml_children(node, dialect, "innerBoundaryIs"))
        .map(|interior| read_ring(interior, dialect))
        .collect::<Result<Vec<LineString>, GmlError>>()?;
    Ok(Polygon::new(read_ring(exterior, dialect)?, interiors))
}

fn read_surface(node: Node, dialect: GmlDialect) -> Result<Vec<Polygon>, GmlError> {
    let patches = first_gml_child(node, dialect, "patches")
        .ok_or_else(|| invalid_geometry(node, "missing <patches>"))?;
    patches
        .children()
        .filter(|child| dialect.is_gml_element(child))
        .map(|patch| read_polygon(patch, dialect))
        .collect()
}

/// Geometries of the member properties of a multi geometry. `single` names properties holding
/// one geometry each, `plural` names properties holding any number.
fn read_members(
    node: Node,
    dialect: GmlDialect,
    single: &[&str],
    plural: &[&str],
) -> Result<Vec<Geometry>, GmlError> {
    let mut geometries = Vec::new();
    for property in node.children().filter(|child| dialect.is_gml_element(child)) {
        let name = property.tag_name().name();
        if !single.contains(&name) && !plural.contains(&name) {
            continue;
        }
        for member in property.children().filter(|child| child.is_element()) {
            match read_geometry(member, dialect)? {
                Some(geometry) => geometries.push(geometry),
                None => {
                    return Err(invalid_geometry(
                        node,
                        format!("unsupported member <{}>", member.tag_name().name()),
                    ))
                }
            }
        }
    }
    Ok(geometries)
}

fn unexpected_member(node: Node, geometry: &Geometry) -> GmlError {
    invalid_geometry(node, format!("unexpected member geometry {:?}", geometry))
}

fn read_multi_point(node: Node, dialect: GmlDialect) -> Result<MultiPoint, GmlError> {
    read_members(node, dialect, &["pointMember"], &["pointMembers"])?
        .into_iter()
        .map(|geometry| match geometry {
            Geometry::Point(point) => Ok(point),
            other => Err(unexpected_member(node, &other)),
        })
        .collect::<Result<Vec<Point>, GmlError>>()
        .map(MultiPoint)
}

fn read_multi_line(node: Node, dialect: GmlDialect) -> Result<MultiLineString, GmlError> {
    let mut lines = Vec::new();
    for geometry in read_members(
        node,
        dialect,
        &["lineStringMember", "curveMember"],
        &["curveMembers"],
    )? {
        match geometry {
            Geometry::LineString(line) => lines.push(line),
            Geometry::MultiLineString(multi_line) => lines.extend(multi_line.0),
            other => return Err(unexpected_member(node, &other)),
        }
    }
    Ok(MultiLineString(lines))
}

fn read_multi_polygon(node: Node, dialect: GmlDialect) -> Result<MultiPolygon, GmlError> {
    let mut polygons = Vec::new();
    for geometry in read_members(
        node,
        dialect,
        &["polygonMember", "surfaceMember"],
        &["surfaceMembers"],
    )? {
        match geometry {
            Geometry::Polygon(polygon) => polygons.push(polygon),
            Geometry::MultiPolygon(multi_polygon) => polygons.extend(multi_polygon.0),
            other => return Err(unexpected_member(node, &other)),
        }
    }
    Ok(MultiPolygon(polygons))
}

/// `Envelope` (3.x, lower and upper corner) or `Box` (2, two coordinates), as a rectangle.
fn read_envelope(node: Node, dialect: GmlDialect) -> Result<Polygon, GmlError> {
    let corners = match (
        first_gml_child(node, dialect, "lowerCorner"),
        first_gml_child(node, dialect, "upperCorner"),
    ) {
        (Some(lower), Some(upper)) => vec![parse_pos(lower)?, parse_pos(upper)?],
        _ => read_coords(node, dialect)?,
    };
    if corners.len() != 2 {
        return Err(invalid_geometry(
            node,
            format!("expected 2 corners, found {}", corners.len()),
        ));
    }
    Ok(geo::Rect::new(corners[0], corners[1]).to_polygon())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{Geometry, LineString, Point};
    use rstest::rstest;

    use crate::{
        gml::{
            dialect::{GmlDialect, GML32_NAMESPACE, GML_NAMESPACE},
            error::GmlError,
        },
        xml_utils::parse_xml,
    };

    use super::read_geometry;

    fn read(fragment: &str, dialect: GmlDialect) -> Result<Option<Geometry>, GmlError> {
        let text = format!(
            r#"<gml:geometryProperty xmlns:gml="{}">{}</gml:geometryProperty>"#,
            dialect.namespace(),
            fragment
        );
        let document = parse_xml(&text).unwrap();
        let node = document.root_element().first_element_child().unwrap();
        read_geometry(node, dialect)
    }

    #[rstest]
    #[case(GmlDialect::Gml32)]
    #[case(GmlDialect::Gml3)]
    fn test_read_point(#[case] dialect: GmlDialect) {
        let geometry = read("<gml:Point><gml:pos>600000 6225000</gml:pos></gml:Point>", dialect)
            .unwrap()
            .unwrap();
        assert_eq!(Geometry::Point(Point::new(600000.0, 6225000.0)), geometry);
    }

    #[test]
    fn test_read_line_string_with_srs_dimension_3() {
        let geometry = read(
            r#"<gml:LineString srsDimension="3"><gml:posList>0 0 5 10 0 6 10 10 7</gml:posList></gml:LineString>"#,
            GmlDialect::Gml32,
        )
        .unwrap()
        .unwrap();
        let expected: LineString = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)].into();
        assert_eq!(Geometry::LineString(expected), geometry);
    }

    #[test]
    fn test_read_polygon_with_hole() {
        let geometry = read(
            "<gml:Polygon>\
               <gml:exterior><gml:LinearRing><gml:posList>0 0 10 0 10 10 0 10 0 0</gml:posList></gml:LinearRing></gml:exterior>\
               <gml:interior><gml:LinearRing><gml:posList>2 2 4 2 4 4 2 2</gml:posList></gml:LinearRing></gml:interior>\
             </gml:Polygon>",
            GmlDialect::Gml32,
        )
        .unwrap()
        .unwrap();
        let Geometry::Polygon(polygon) = geometry else {
            panic!("Expected a polygon, got {:?}", geometry);
        };
        assert_eq!(5, polygon.exterior().coords().count());
        assert_eq!(1, polygon.interiors().len());
    }

    #[test]
    fn test_read_gml2_polygon_with_coordinates() {
        let geometry = read(
            r#"<gml:Polygon><gml:outerBoundaryIs><gml:LinearRing>
                 <gml:coordinates decimal="," cs=";" ts=" ">0,5;0 10;0 10;10 0,5;0</gml:coordinates>
               </gml:LinearRing></gml:outerBoundaryIs></gml:Polygon>"#,
            GmlDialect::Gml3,
        )
        .unwrap()
        .unwrap();
        let Geometry::Polygon(polygon) = geometry else {
            panic!("Expected a polygon, got {:?}", geometry);
        };
        let first = polygon.exterior().0[0];
        assert_abs_diff_eq!(0.5, first.x);
        assert_abs_diff_eq!(0.0, first.y);
        assert_eq!(4, polygon.exterior().coords().count());
    }

    #[test]
    fn test_read_curve_joins_segments() {
        let geometry = read(
            "<gml:Curve><gml:segments>\
               <gml:LineStringSegment><gml:posList>0 0 1 0</gml:posList></gml:LineStringSegment>\
               <gml:LineStringSegment><gml:posList>1 0 1 1</gml:posList></gml:LineStringSegment>\
             </gml:segments></gml:Curve>",
            GmlDialect::Gml32,
        )
        .unwrap()
        .unwrap();
        let expected: LineString = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)].into();
        assert_eq!(Geometry::LineString(expected), geometry);
    }

    #[test]
    fn test_read_multi_surface() {
        let polygon = "<gml:Polygon><gml:exterior><gml:LinearRing><gml:posList>0 0 1 0 1 1 0 0</gml:posList></gml:LinearRing></gml:exterior></gml:Polygon>";
        let geometry = read(
            &format!(
                "<gml:MultiSurface><gml:surfaceMember>{polygon}</gml:surfaceMember><gml:surfaceMembers>{polygon}{polygon}</gml:surfaceMembers></gml:MultiSurface>"
            ),
            GmlDialect::Gml32,
        )
        .unwrap()
        .unwrap();
        let Geometry::MultiPolygon(multi_polygon) = geometry else {
            panic!("Expected a multi polygon, got {:?}", geometry);
        };
        assert_eq!(3, multi_polygon.0.len());
    }

    #[test]
    fn test_read_multi_point_rejects_line_member() {
        let result = read(
            "<gml:MultiPoint><gml:pointMember><gml:LineString><gml:posList>0 0 1 1</gml:posList></gml:LineString></gml:pointMember></gml:MultiPoint>",
            GmlDialect::Gml32,
        );
        assert!(matches!(result, Err(GmlError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_read_envelope() {
        let geometry = read(
            "<gml:Envelope><gml:lowerCorner>0 0</gml:lowerCorner><gml:upperCorner>2 1</gml:upperCorner></gml:Envelope>",
            GmlDialect::Gml32,
        )
        .unwrap()
        .unwrap();
        let Geometry::Polygon(polygon) = geometry else {
            panic!("Expected a polygon, got {:?}", geometry);
        };
        assert_eq!(5, polygon.exterior().coords().count());
    }

    #[rstest]
    #[case("<gml:Point><gml:pos>600000 north</gml:pos></gml:Point>")]
    #[case("<gml:Point><gml:pos>600000</gml:pos></gml:Point>")]
    #[case("<gml:LineString><gml:posList>0 0 1</gml:posList></gml:LineString>")]
    #[case(r#"<gml:LineString srsDimension="1"><gml:posList>0 0</gml:posList></gml:LineString>"#)]
    fn test_invalid_coordinates(#[case] fragment: &str) {
        let result = read(fragment, GmlDialect::Gml32);
        assert!(
            matches!(result, Err(GmlError::InvalidCoordinates { .. })),
            "{:?}",
            result
        );
    }

    #[test]
    fn test_polygon_without_exterior() {
        let result = read("<gml:Polygon/>", GmlDialect::Gml32);
        assert!(matches!(result, Err(GmlError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_other_namespace_is_not_a_geometry() {
        let text = format!(
            r#"<w xmlns:a="{}" xmlns:b="{}"><a:Point><a:pos>1 2</a:pos></a:Point><b:Solid/></w>"#,
            GML32_NAMESPACE, GML_NAMESPACE
        );
        let document = parse_xml(&text).unwrap();
        let mut children = document.root_element().children().filter(|n| n.is_element());
        let point = children.next().unwrap();
        let solid = children.next().unwrap();

        assert!(read_geometry(point, GmlDialect::Gml3).unwrap().is_none());
        assert!(read_geometry(solid, GmlDialect::Gml3).unwrap().is_none());
    }
}
