//! Normalized data produced by the parsers.

pub mod object;
pub mod route;
