//! Core domain types shared by the conversion pipeline.

pub mod errors;
pub mod model;
