//! The copies-to-clones conversion run.

use crate::app::convert::{self, ReplaceOptions};
use crate::app::discover;
use crate::app::image;
use crate::app::resolve;
use crate::app::selection::Selection;
use crate::app::transform;
use crate::domain::errors::CloneError;
use crate::domain::model::{
    ClonePlacement, ConversionReport, ConvertedClone, Outcome, TransformMode,
};
use crate::infra::config::Config;
use crate::infra::svg::Document;

/// Runtime options controlling conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneOptions {
    pub transform_mode: TransformMode,
    pub placement: ClonePlacement,
    pub preserve_ids: bool,
    pub precision: Option<u32>,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CloneOptions {
    /// Build options from configuration defaults.
    pub fn from_config(config: &Config) -> Self {
        Self {
            transform_mode: config.cloning.transform_mode(),
            placement: config.cloning.placement(),
            preserve_ids: config.cloning.preserve_ids(),
            precision: config.cloning.precision(),
        }
    }

    fn replace_options(&self) -> ReplaceOptions {
        ReplaceOptions {
            placement: self.placement,
            preserve_ids: self.preserve_ids,
        }
    }
}

/// Replace every copy of the selected image with a `<use>` clone of its original.
///
/// Fatal problems are returned before the tree is touched. Per-copy transform failures are
/// logged and the copy is converted without a transform.
pub fn convert_copies_to_clones(
    doc: &mut Document,
    selection: &Selection,
    options: &CloneOptions,
) -> Result<Outcome, CloneError> {
    let Some(selected) = selection.first_image(doc) else {
        tracing::info!(selected = selection.len(), "no image in selection");
        return Ok(Outcome::NoImageSelected);
    };

    let original = resolve::resolve_original(doc, selected)?;
    // Selection and clone-of lookup both go through ids, so the original always has one.
    let original_id = doc.attribute(original, "id").unwrap_or_default().to_owned();
    let not_a_group = || Outcome::NotACloneGroup {
        image_id: Some(original_id.clone()),
    };

    let reference = match image::resource_reference(doc, original) {
        Some(reference) if image::is_image(doc, original) => reference.to_owned(),
        _ => {
            tracing::info!("original is not an image with a resource reference");
            return Ok(not_a_group());
        }
    };

    let duplicates: Vec<_> = discover::images_with_reference(doc, &reference)
        .into_iter()
        .filter(|&node| node != original)
        .collect();
    if duplicates.is_empty() {
        tracing::info!(reference = %reference, "no duplicates share the reference");
        return Ok(not_a_group());
    }

    let original_geometry =
        image::geometry(doc, original).map_err(|source| CloneError::OriginalGeometry {
            id: original_id.clone(),
            source,
        })?;
    if !original_geometry.has_usable_extent() {
        return Err(CloneError::DegenerateOriginal {
            id: original_id,
            width: original_geometry.width,
            height: original_geometry.height,
        });
    }
    let original_transform = image::transform_attribute(doc, original).map(str::to_owned);
    tracing::info!(
        original = %original_id,
        reference = %reference,
        duplicates = duplicates.len(),
        mode = options.transform_mode.as_str(),
        "converting copies to clones"
    );

    let mut clones = Vec::with_capacity(duplicates.len());
    for duplicate in duplicates {
        let replaced_id = doc.attribute(duplicate, "id").map(str::to_owned);
        let computed = image::geometry(doc, duplicate)
            .map_err(Into::into)
            .and_then(|geometry| {
                transform::clone_transform(
                    &original_geometry,
                    original_transform.as_deref(),
                    &geometry,
                    image::transform_attribute(doc, duplicate),
                    options.transform_mode,
                )
            });

        let (transform, error) = match computed {
            Ok(affine) => {
                let rendered = affine.to_svg(options.precision);
                tracing::info!(duplicate = ?replaced_id, transform = %rendered, "computed clone transform");
                (Some(rendered), None)
            }
            Err(err) => {
                tracing::warn!(duplicate = ?replaced_id, error = %err, "failed to compute clone transform");
                (None, Some(err.to_string()))
            }
        };

        let Some(clone_id) = convert::replace_with_clone(
            doc,
            duplicate,
            &original_id,
            transform.as_deref(),
            options.replace_options(),
        ) else {
            tracing::warn!(duplicate = ?replaced_id, "duplicate has no parent element; skipped");
            continue;
        };

        clones.push(ConvertedClone {
            clone_id,
            replaced_id,
            transform,
            error,
        });
    }

    Ok(Outcome::Converted(ConversionReport {
        original_id,
        reference,
        clones,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd">
  <image id="img1" x="0" y="0" width="100" height="100" xlink:href="pic.png"/>
  <g id="layer">
    <image id="img2" x="50" y="25" width="50" height="50" xlink:href="pic.png" sodipodi:clone-of="img1"/>
    <image id="img3" x="10" y="10" height="50" xlink:href="pic.png"/>
  </g>
  <image id="other" x="0" y="0" width="10" height="10" xlink:href="other.png"/>
</svg>"##;

    fn run(source: &str, ids: &[&str]) -> (Document, Result<Outcome, CloneError>) {
        let mut doc = Document::parse(source).unwrap();
        let outcome = convert_copies_to_clones(
            &mut doc,
            &Selection::from_ids(ids.iter().copied()),
            &CloneOptions::default(),
        );
        (doc, outcome)
    }

    #[test]
    fn converts_copies_selected_through_back_reference() {
        let (doc, outcome) = run(GROUP, &["img2"]);
        let Outcome::Converted(report) = outcome.unwrap() else {
            panic!("expected conversion");
        };

        assert_eq!(report.original_id, "img1");
        assert_eq!(report.reference, "pic.png");
        assert_eq!(report.clones.len(), 2);
        assert_eq!(
            report.clones[0].transform.as_deref(),
            Some("matrix(0.5, 0, 0, 0.5, 50, 25)")
        );
        assert_eq!(report.degraded(), 1);
        assert_eq!(report.clones[1].transform, None);
        assert!(report.clones[1].error.as_deref().unwrap().contains("width"));

        let images = discover::images_with_reference(&doc, "pic.png");
        assert_eq!(images.len(), 1);
        assert!(doc.element_by_id("other").is_some());
    }

    #[test]
    fn second_run_finds_no_duplicates() {
        let (doc, outcome) = run(GROUP, &["img1"]);
        assert!(outcome.unwrap().is_mutation());

        let rewritten = doc.to_xml_string();
        let (_, second) = run(&rewritten, &["img1"]);
        assert_eq!(
            second.unwrap(),
            Outcome::NotACloneGroup {
                image_id: Some("img1".into())
            }
        );
    }

    #[test]
    fn reports_missing_image_selection() {
        let (_, outcome) = run(GROUP, &["layer"]);
        assert_eq!(outcome.unwrap(), Outcome::NoImageSelected);
        let (_, outcome) = run(GROUP, &[]);
        assert_eq!(outcome.unwrap(), Outcome::NoImageSelected);
    }

    #[test]
    fn lone_image_is_not_a_clone_group() {
        let (_, outcome) = run(GROUP, &["other"]);
        assert_eq!(
            outcome.unwrap(),
            Outcome::NotACloneGroup {
                image_id: Some("other".into())
            }
        );
    }

    #[test]
    fn degenerate_original_is_rejected_before_mutation() {
        let source = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <image id="a" width="0" height="10" href="p.png"/>
  <image id="b" width="5" height="10" href="p.png"/>
</svg>"#;
        let (doc, outcome) = run(source, &["a"]);
        assert!(matches!(
            outcome,
            Err(CloneError::DegenerateOriginal { ref id, .. }) if id == "a"
        ));
        assert!(doc.element_by_id("b").is_some());
    }

    #[test]
    fn zero_height_original_is_degenerate() {
        let source = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <image id="a" width="10" height="0" href="p.png"/>
  <image id="b" width="5" height="10" href="p.png"/>
</svg>"#;
        let (doc, outcome) = run(source, &["a"]);
        assert!(matches!(
            outcome,
            Err(CloneError::DegenerateOriginal { ref id, height, .. }) if id == "a" && height == 0.0
        ));
        assert!(doc.element_by_id("a").is_some());
        assert!(doc.element_by_id("b").is_some());
    }

    #[test]
    fn clone_of_pointing_at_non_image_is_not_a_clone_group() {
        let source = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd">
  <rect id="box" width="10" height="10"/>
  <image id="a" width="10" height="10" href="p.png" sodipodi:clone-of="#box"/>
  <image id="b" width="10" height="10" href="p.png"/>
</svg>"##;
        let (doc, outcome) = run(source, &["a"]);
        assert_eq!(
            outcome.unwrap(),
            Outcome::NotACloneGroup {
                image_id: Some("box".into())
            }
        );
        assert_eq!(discover::images_with_reference(&doc, "p.png").len(), 2);
    }

    #[test]
    fn original_without_reference_is_not_a_clone_group() {
        let source = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd">
  <image id="bare" width="10" height="10"/>
  <image id="a" width="10" height="10" href="p.png" sodipodi:clone-of="bare"/>
</svg>"#;
        let (_, outcome) = run(source, &["a"]);
        assert_eq!(
            outcome.unwrap(),
            Outcome::NotACloneGroup {
                image_id: Some("bare".into())
            }
        );
    }

    #[test]
    fn invalid_original_geometry_aborts_before_mutation() {
        for original in [
            r#"<image id="a" width="50%" height="10" href="p.png"/>"#,
            r#"<image id="a" width="10" href="p.png"/>"#,
        ] {
            let source = format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg">
  {original}
  <image id="b" width="5" height="10" href="p.png"/>
</svg>"#
            );
            let (doc, outcome) = run(&source, &["a"]);
            assert!(
                matches!(outcome, Err(CloneError::OriginalGeometry { ref id, .. }) if id == "a"),
                "unexpected outcome for {original}: {outcome:?}"
            );
            assert!(doc.element_by_id("b").is_some());
            assert_eq!(discover::images_with_reference(&doc, "p.png").len(), 2);
        }
    }
}
