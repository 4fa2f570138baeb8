//! Replacing duplicate images with `<use>` clones.

use crate::domain::model::ClonePlacement;
use crate::infra::svg::{Document, NodeId, QName, XLINK_NS};

/// Settings for a single replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    pub placement: ClonePlacement,
    pub preserve_ids: bool,
}

/// Insert a `<use>` pointing at `#original_id` next to `duplicate`, then remove the duplicate.
/// Returns the id of the new clone, or `None` if the duplicate was not attached to a parent.
pub fn replace_with_clone(
    doc: &mut Document,
    duplicate: NodeId,
    original_id: &str,
    transform: Option<&str>,
    options: ReplaceOptions,
) -> Option<String> {
    let parent = doc.parent(duplicate)?;
    let replaced_id = doc.attribute(duplicate, "id").map(str::to_owned);

    // Same namespace and prefix as the image it replaces.
    let name = match doc.element(duplicate) {
        Some(element) => QName {
            prefix: element.name.prefix.clone(),
            local: "use".to_owned(),
            namespace: element.name.namespace.clone(),
        },
        None => QName::local("use"),
    };
    let xlink = doc
        .ensure_namespace(XLINK_NS, "xlink")
        .unwrap_or_else(|| "xlink".to_owned());

    let clone = doc.create_element(name);
    doc.set_attribute(
        clone,
        QName::namespaced(Some(xlink), "href", XLINK_NS),
        format!("#{original_id}"),
    );
    if let Some(transform) = transform {
        doc.set_attribute(clone, QName::local("transform"), transform);
    }

    match options.placement {
        ClonePlacement::Append => doc.append_child(parent, clone),
        ClonePlacement::InPlace => doc.insert_before(duplicate, clone),
    }
    doc.remove(duplicate);

    let clone_id = match replaced_id.filter(|_| options.preserve_ids) {
        Some(id) => id,
        None => doc.unique_id("clone"),
    };
    doc.set_attribute(clone, QName::local("id"), clone_id.clone());
    Some(clone_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
  <image id="orig" width="10" height="10" xlink:href="a.png"/>
  <g id="layer">
    <image id="dup" width="10" height="10" xlink:href="a.png"/>
    <rect id="top" width="1" height="1"/>
  </g>
</svg>"#;

    fn element_ids(doc: &Document, parent: NodeId) -> Vec<String> {
        doc.children(parent)
            .iter()
            .filter_map(|&child| doc.attribute(child, "id"))
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn appends_clone_and_removes_duplicate() {
        let mut doc = Document::parse(SVG).unwrap();
        let dup = doc.element_by_id("dup").unwrap();
        let layer = doc.element_by_id("layer").unwrap();

        let options = ReplaceOptions {
            placement: ClonePlacement::Append,
            preserve_ids: true,
        };
        let clone_id =
            replace_with_clone(&mut doc, dup, "orig", Some("matrix(1, 0, 0, 1, 5, 5)"), options)
                .unwrap();

        assert_eq!(clone_id, "dup");
        assert!(!doc.is_attached(dup));
        assert_eq!(element_ids(&doc, layer), ["top", "dup"]);

        let clone = doc.element_by_id("dup").unwrap();
        assert!(doc.is_element(clone, Some(crate::infra::svg::SVG_NS), "use"));
        assert_eq!(doc.attribute_ns(clone, XLINK_NS, "href"), Some("#orig"));
        assert_eq!(
            doc.attribute(clone, "transform"),
            Some("matrix(1, 0, 0, 1, 5, 5)")
        );
        assert!(doc.to_xml_string().contains(
            r##"<use xlink:href="#orig" transform="matrix(1, 0, 0, 1, 5, 5)" id="dup" />"##
        ));
    }

    #[test]
    fn in_place_keeps_stacking_order_and_fresh_ids() {
        let mut doc = Document::parse(SVG).unwrap();
        let dup = doc.element_by_id("dup").unwrap();
        let layer = doc.element_by_id("layer").unwrap();

        let options = ReplaceOptions {
            placement: ClonePlacement::InPlace,
            preserve_ids: false,
        };
        let clone_id = replace_with_clone(&mut doc, dup, "orig", None, options).unwrap();

        assert_eq!(clone_id, "clone1");
        assert_eq!(element_ids(&doc, layer), ["clone1", "top"]);
        let clone = doc.element_by_id("clone1").unwrap();
        assert_eq!(doc.attribute(clone, "transform"), None);
    }
}
