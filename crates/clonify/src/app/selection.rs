//! Selection handed over by the host editor.

use crate::app::image;
use crate::infra::svg::{Document, NodeId};

/// Element ids the host reported as selected, in selection order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from host-supplied ids. Blank and repeated ids are dropped.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self::new();
        for id in ids {
            selection.add(id);
        }
        selection
    }

    pub fn add(&mut self, id: impl Into<String>) {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() || self.ids.iter().any(|existing| existing == id) {
            return;
        }
        self.ids.push(id.to_owned());
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// First selected element that is an image. Ids missing from the document are skipped.
    pub fn first_image(&self, doc: &Document) -> Option<NodeId> {
        self.ids
            .iter()
            .filter_map(|id| doc.element_by_id(id))
            .find(|&node| image::is_image(doc, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <rect id="r1" width="1" height="1"/>
  <image id="i1" width="1" height="1" href="a.png"/>
  <image id="i2" width="1" height="1" href="b.png"/>
</svg>"#;

    #[test]
    fn drops_blank_and_repeated_ids() {
        let selection = Selection::from_ids(["a", " ", "b", "a", " c "]);
        assert_eq!(selection.ids(), ["a", "b", "c"]);
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn first_image_skips_other_elements_and_unknown_ids() {
        let doc = Document::parse(SVG).unwrap();
        let selection = Selection::from_ids(["missing", "r1", "i2", "i1"]);
        let node = selection.first_image(&doc).unwrap();
        assert_eq!(doc.attribute(node, "id"), Some("i2"));
    }

    #[test]
    fn no_image_when_nothing_selected() {
        let doc = Document::parse(SVG).unwrap();
        assert!(Selection::new().is_empty());
        assert_eq!(Selection::new().first_image(&doc), None);
        assert_eq!(Selection::from_ids(["r1"]).first_image(&doc), None);
    }
}
