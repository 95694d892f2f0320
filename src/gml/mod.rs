pub mod dialect;
pub mod error;
pub mod geometry;
pub mod grouping;
pub mod reader;
