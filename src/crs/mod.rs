pub mod crs_registry;
pub mod crs_utils;
