pub mod description;
pub mod error;
pub mod extractor;
