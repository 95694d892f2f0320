//! Derives a `SchemaDescriptionTable` from an XML schema.
//!
//! This is a descriptive scan, not a schema compiler: declarations are matched by local name so
//! `xs:`, `xsd:` and unprefixed schemas all work, references are not resolved and declarations
//! without a `name` or `type` are skipped.

use roxmltree::Node;
use serde::Deserialize;

use crate::xml_utils::{has_local_name, parse_xml, text_content};

use super::{
    description::{FieldDescription, SchemaDescriptionTable, TypeDescription},
    error::SchemaError,
};

/// Which element declarations become primitive descriptions.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ElementScope {
    /// Every element declaration in the document, local ones included.
    #[default]
    AllDeclarations,
    /// Global declarations only, the direct children of the schema element.
    TopLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub element_scope: ElementScope,
}

pub fn extract_type_descriptions(schema_text: &str) -> Result<SchemaDescriptionTable, SchemaError> {
    extract_type_descriptions_with_options(schema_text, &ExtractOptions::default())
}

/// Build the description table of a schema.
///
/// Element declarations are scanned first, then named complex types. A complex type replaces an
/// element description of the same name.
pub fn extract_type_descriptions_with_options(
    schema_text: &str,
    options: &ExtractOptions,
) -> Result<SchemaDescriptionTable, SchemaError> {
    let document = parse_xml(schema_text)?;
    let schema = document.root_element();
    if !has_local_name(&schema, "schema") {
        return Err(SchemaError::NotASchema(
            schema.tag_name().name().to_string(),
        ));
    }

    let mut table = SchemaDescriptionTable::new();
    for (name, description) in scan_elements(schema, options.element_scope) {
        table.insert(name, description);
    }
    for (name, fields) in scan_complex_types(schema) {
        if let Some(TypeDescription::Primitive { .. }) = table.get(&name) {
            log::warn!(
                "Complex type '{}' replaces the element description of the same name",
                name
            );
        }
        table.insert(name, TypeDescription::Composite(fields));
    }
    Ok(table)
}

/// Trimmed text of the first `annotation/documentation` below `node`, if both are present.
pub fn extract_documentation(node: Node) -> Option<String> {
    let annotation = node
        .children()
        .find(|child| has_local_name(child, "annotation"))?;
    let documentation = annotation
        .children()
        .find(|child| has_local_name(child, "documentation"))?;
    Some(text_content(documentation))
}

/// `name` and `type` of a declaration that carries both.
fn named_and_typed(declaration: &Node) -> Option<(String, String)> {
    match (declaration.attribute("name"), declaration.attribute("type")) {
        (Some(name), Some(declared_type)) if !name.is_empty() && !declared_type.is_empty() => {
            Some((name.to_string(), declared_type.to_string()))
        }
        _ => {
            log::debug!(
                "Skipping element declaration without name and type at byte {}",
                declaration.range().start
            );
            None
        }
    }
}

fn scan_elements(schema: Node, scope: ElementScope) -> Vec<(String, TypeDescription)> {
    let declarations: Vec<Node> = match scope {
        ElementScope::TopLevel => schema
            .children()
            .filter(|child| has_local_name(child, "element"))
            .collect(),
        ElementScope::AllDeclarations => schema
            .descendants()
            .filter(|descendant| has_local_name(descendant, "element"))
            .collect(),
    };
    declarations
        .into_iter()
        .filter_map(|declaration| {
            let (name, declared_type) = named_and_typed(&declaration)?;
            Some((
                name,
                TypeDescription::primitive(declared_type, extract_documentation(declaration)),
            ))
        })
        .collect()
}

/// The sequence defining a complex type's content: a direct child, or the child of its
/// `complexContent` extension or restriction.
fn content_sequence<'a, 'input>(complex_type: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    let is_sequence = |node: &Node| has_local_name(node, "sequence");
    complex_type.children().find(is_sequence).or_else(|| {
        complex_type
            .children()
            .filter(|child| has_local_name(child, "complexContent"))
            .flat_map(|content| content.children())
            .filter(|derivation| {
                has_local_name(derivation, "extension") || has_local_name(derivation, "restriction")
            })
            .flat_map(|derivation| derivation.children())
            .find(is_sequence)
    })
}

/// Every element declaration below a sequence in document order, including those of nested
/// groups and anonymous types.
fn sequence_declarations<'a, 'input>(sequence: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    sequence
        .descendants()
        .filter(|descendant| has_local_name(descendant, "element"))
        .collect()
}

fn scan_complex_types(schema: Node) -> Vec<(String, Vec<FieldDescription>)> {
    schema
        .descendants()
        .filter(|descendant| has_local_name(descendant, "complexType"))
        .filter_map(|complex_type| {
            let name = complex_type
                .attribute("name")
                .filter(|name| !name.is_empty())?;
            let sequence = content_sequence(complex_type)?;
            let fields = sequence_declarations(sequence)
                .into_iter()
                .filter_map(|declaration| {
                    let (field_name, declared_type) = named_and_typed(&declaration)?;
                    Some(FieldDescription {
                        field_name,
                        declared_type,
                        documentation: extract_documentation(declaration),
                    })
                })
                .collect();
            Some((name.to_string(), fields))
        })
        .collect()
}
