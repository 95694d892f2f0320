use thiserror::Error;

/// Errors that abort decoding of a GML document. No features are returned alongside any of them.
#[derive(Debug, Error)]
pub enum GmlError {
    /// The markup is not well-formed XML.
    #[error("Could not parse GML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Invalid coordinates in <{element}>: {reason}")]
    InvalidCoordinates { element: String, reason: String },

    #[error("Invalid geometry <{element}>: {reason}")]
    InvalidGeometry { element: String, reason: String },

    /// Reprojection is left to the mapping engine.
    #[error("Feature CRS {feature_crs} differs from data CRS {data_crs}")]
    CrsMismatch {
        feature_crs: String,
        data_crs: String,
    },
}
