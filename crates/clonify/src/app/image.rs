//! Reading image elements out of the document tree.

use std::str::FromStr;

use svgtypes::{Length, LengthUnit};

use crate::domain::errors::GeometryError;
use crate::domain::model::ImageGeometry;
use crate::infra::svg::{Document, NodeId, SODIPODI_NS, SVG_NS, XLINK_NS};

/// `<image>` in the SVG namespace, or un-namespaced in documents without one.
pub fn is_image(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node, Some(SVG_NS), "image") || doc.is_element(node, None, "image")
}

/// The resource the image displays: `xlink:href`, falling back to SVG 2 `href`.
pub fn resource_reference(doc: &Document, node: NodeId) -> Option<&str> {
    doc.attribute_ns(node, XLINK_NS, "href")
        .or_else(|| doc.attribute(node, "href"))
        .filter(|value| !value.is_empty())
}

/// Id named by the `sodipodi:clone-of` back-reference, without a leading `#`.
pub fn clone_of(doc: &Document, node: NodeId) -> Option<&str> {
    doc.attribute_ns(node, SODIPODI_NS, "clone-of")
        .map(|value| value.trim().trim_start_matches('#'))
        .filter(|value| !value.is_empty())
}

/// Non-empty `transform` attribute.
pub fn transform_attribute(doc: &Document, node: NodeId) -> Option<&str> {
    doc.attribute(node, "transform")
        .filter(|value| !value.trim().is_empty())
}

/// Position and size. `x`/`y` default to zero; `width`/`height` are required.
pub fn geometry(doc: &Document, node: NodeId) -> Result<ImageGeometry, GeometryError> {
    Ok(ImageGeometry {
        x: optional_length(doc, node, "x")?.unwrap_or(0.0),
        y: optional_length(doc, node, "y")?.unwrap_or(0.0),
        width: required_length(doc, node, "width")?,
        height: required_length(doc, node, "height")?,
    })
}

fn required_length(doc: &Document, node: NodeId, name: &'static str) -> Result<f64, GeometryError> {
    optional_length(doc, node, name)?.ok_or(GeometryError::MissingAttribute { name })
}

fn optional_length(
    doc: &Document,
    node: NodeId,
    name: &'static str,
) -> Result<Option<f64>, GeometryError> {
    let Some(raw) = doc.attribute(node, name) else {
        return Ok(None);
    };
    parse_user_length(raw)
        .map(Some)
        .ok_or_else(|| GeometryError::InvalidLength {
            name,
            value: raw.to_owned(),
        })
}

/// Plain numbers and `px` lengths are user units; anything else needs a viewport to resolve.
fn parse_user_length(raw: &str) -> Option<f64> {
    let length = Length::from_str(raw.trim()).ok()?;
    match length.unit {
        LengthUnit::None | LengthUnit::Px if length.number.is_finite() => Some(length.number),
        _ => None,
    }
}
