//! Domain models for image geometry, conversion settings, and run outcomes.

use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position and size of an `<image>` in its own user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageGeometry {
    /// Whether the extent can be used as a scale divisor.
    pub fn has_usable_extent(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width != 0.0 && self.height != 0.0
    }
}

/// How an existing per-duplicate transform is combined with the computed placement.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum TransformMode {
    /// Full composition: existing transforms also act on the translation.
    #[default]
    Composed,
    /// Scale after the existing transform, then overwrite the translation slots.
    Legacy,
}

impl TransformMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Composed => "composed",
            TransformMode::Legacy => "legacy",
        }
    }
}

impl FromStr for TransformMode {
    type Err = SettingParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "composed" | "compose" => Ok(TransformMode::Composed),
            "legacy" | "overwrite" => Ok(TransformMode::Legacy),
            other => Err(SettingParseError::UnknownTransformMode(other.to_string())),
        }
    }
}

/// Where the new `<use>` element goes relative to the duplicate it replaces.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ClonePlacement {
    /// Last child of the duplicate's parent.
    #[default]
    Append,
    /// The duplicate's former position, keeping stacking order.
    InPlace,
}

/// Error returned when parsing a setting from the environment fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingParseError {
    #[error("unknown transform mode '{0}'")]
    UnknownTransformMode(String),
}

/// One duplicate that was replaced by a `<use>` clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedClone {
    pub clone_id: String,
    pub replaced_id: Option<String>,
    pub transform: Option<String>,
    /// Why the transform could not be computed, if it could not.
    pub error: Option<String>,
}

/// Summary of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub original_id: String,
    pub reference: String,
    pub clones: Vec<ConvertedClone>,
}

impl ConversionReport {
    /// Number of clones written without a transform.
    pub fn degraded(&self) -> usize {
        self.clones.iter().filter(|clone| clone.error.is_some()).count()
    }
}

/// Result of one run over a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    NoImageSelected,
    NotACloneGroup { image_id: Option<String> },
    Converted(ConversionReport),
}

impl Outcome {
    /// Whether the document was changed and needs writing.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Outcome::Converted(_))
    }

    /// Message shown to the user by the host.
    pub fn message(&self) -> String {
        match self {
            Outcome::NoImageSelected => "Please select an image.".to_owned(),
            Outcome::NotACloneGroup { .. } => {
                "Selected image is not part of a clone group or is already the original."
                    .to_owned()
            }
            Outcome::Converted(report) => {
                let count = report.clones.len();
                let noun = if count == 1 { "copy" } else { "copies" };
                let mut message = format!(
                    "Converted {count} {noun} of '{}' into clones.",
                    report.original_id
                );
                let degraded = report.degraded();
                if degraded > 0 {
                    message.push_str(&format!(
                        " {degraded} could not be positioned and were left untransformed; see the log."
                    ));
                }
                message
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_mode_parses_aliases() {
        assert_eq!("Legacy".parse(), Ok(TransformMode::Legacy));
        assert_eq!(" composed ".parse(), Ok(TransformMode::Composed));
        assert!("sideways".parse::<TransformMode>().is_err());
    }

    #[test]
    fn degenerate_extent_is_unusable() {
        let geometry = ImageGeometry {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 10.0,
        };
        assert!(!geometry.has_usable_extent());
        assert!(
            ImageGeometry {
                width: 10.0,
                ..geometry
            }
            .has_usable_extent()
        );
    }

    #[test]
    fn converted_message_mentions_degraded_clones() {
        let report = ConversionReport {
            original_id: "img1".into(),
            reference: "pic.png".into(),
            clones: vec![
                ConvertedClone {
                    clone_id: "img2".into(),
                    replaced_id: Some("img2".into()),
                    transform: Some("matrix(1, 0, 0, 1, 0, 0)".into()),
                    error: None,
                },
                ConvertedClone {
                    clone_id: "img3".into(),
                    replaced_id: Some("img3".into()),
                    transform: None,
                    error: Some("missing `width` attribute".into()),
                },
            ],
        };
        let message = Outcome::Converted(report).message();
        assert!(message.starts_with("Converted 2 copies of 'img1'"));
        assert!(message.contains("1 could not be positioned"));
    }
}
