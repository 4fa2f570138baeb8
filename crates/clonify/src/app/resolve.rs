//! Finding the canonical original of a selected image.

use crate::app::image;
use crate::domain::errors::CloneError;
use crate::infra::svg::{Document, NodeId};

/// Follow a `sodipodi:clone-of` back-reference if present, otherwise the image is its own
/// original. A back-reference to an id that does not exist is fatal.
pub fn resolve_original(doc: &Document, selected: NodeId) -> Result<NodeId, CloneError> {
    let Some(target) = image::clone_of(doc, selected) else {
        return Ok(selected);
    };
    let original = doc
        .element_by_id(target)
        .ok_or_else(|| CloneError::MissingOriginal {
            id: target.to_owned(),
        })?;
    tracing::debug!(clone_of = target, "resolved clone-of back-reference");
    Ok(original)
}
