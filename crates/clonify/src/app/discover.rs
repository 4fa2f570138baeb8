//! Locating every image that displays the same resource.

use crate::app::image;
use crate::infra::svg::{Document, NodeId};

/// All images whose resource reference equals `reference` exactly, in document order.
/// The original itself is included; callers filter it out by id.
pub fn images_with_reference(doc: &Document, reference: &str) -> Vec<NodeId> {
    doc.elements()
        .filter(|&node| image::is_image(doc, node))
        .filter(|&node| image::resource_reference(doc, node) == Some(reference))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_exactly_in_document_order() {
        let doc = Document::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
  <g><image id="b" xlink:href="pic.png" width="1" height="1"/></g>
  <image id="a" xlink:href="pic.png" width="1" height="1"/>
  <image id="c" xlink:href="./pic.png" width="1" height="1"/>
  <use id="u" xlink:href="pic.png"/>
</svg>"#,
        )
        .unwrap();

        let ids: Vec<&str> = images_with_reference(&doc, "pic.png")
            .into_iter()
            .filter_map(|node| doc.attribute(node, "id"))
            .collect();
        assert_eq!(ids, ["b", "a"]);
    }
}
