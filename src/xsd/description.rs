use indexmap::IndexMap;
use serde::Serialize;

/// One child element declaration of a complex type's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescription {
    #[serde(rename = "name")]
    pub field_name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    #[serde(rename = "doc")]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypeDescription {
    /// A named element declaration and its declared type.
    Primitive {
        #[serde(rename = "type")]
        declared_type: String,
        #[serde(rename = "doc")]
        documentation: Option<String>,
    },
    /// The fields of a named complex type, in declaration order.
    Composite(Vec<FieldDescription>),
}

impl TypeDescription {
    pub fn primitive(declared_type: impl Into<String>, documentation: Option<String>) -> Self {
        TypeDescription::Primitive {
            declared_type: declared_type.into(),
            documentation,
        }
    }

    pub fn fields(&self) -> Option<&[FieldDescription]> {
        match self {
            TypeDescription::Primitive { .. } => None,
            TypeDescription::Composite(fields) => Some(fields.as_slice()),
        }
    }
}

/// Descriptions keyed by element or type name, in the order the names were first declared.
pub type SchemaDescriptionTable = IndexMap<String, TypeDescription>;

/// Render a table for the diagnostic log.
pub fn table_to_yaml(table: &SchemaDescriptionTable) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(table)
}
