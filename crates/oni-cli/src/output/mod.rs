//! Output formatters for scan results

pub mod json;
pub mod sarif;
pub mod text;
