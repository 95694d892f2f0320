use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Could not parse XSD: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Root element must be a schema, found <{0}>")]
    NotASchema(String),
}
