//! Infrastructure adapters for the SVG tree, files, config, and logging.

pub mod config;
pub mod fs;
pub mod logging;
pub mod svg;
