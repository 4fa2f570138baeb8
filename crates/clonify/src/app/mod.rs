//! Application layer: the copies-to-clones pipeline and its steps.

pub mod convert;
pub mod discover;
pub mod image;
pub mod pipeline;
pub mod resolve;
pub mod selection;
pub mod transform;
