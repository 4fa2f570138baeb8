//! Affine arithmetic for placing a clone where its duplicate used to be.

use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

use nalgebra::Matrix3;

use crate::domain::errors::TransformError;
use crate::domain::model::{ImageGeometry, TransformMode};

/// 2-D affine transform as a 3x3 homogeneous matrix with bottom row `0 0 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine(Matrix3<f64>);

impl Affine {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Build from SVG `matrix(a, b, c, d, e, f)` coefficients.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self(Matrix3::new(a, c, e, b, d, f, 0.0, 0.0, 1.0))
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Parse any SVG transform list (`translate(..) rotate(..)` and so on).
    pub fn parse(value: &str) -> Result<Self, TransformError> {
        let ts = svgtypes::Transform::from_str(value).map_err(|err| {
            TransformError::InvalidTransform {
                value: value.to_owned(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self::new(ts.a, ts.b, ts.c, ts.d, ts.e, ts.f))
    }

    pub fn inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Map a point through the transform.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.0;
        (
            m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)],
            m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)],
        )
    }

    /// `[a, b, c, d, e, f]` in SVG order.
    pub fn coefficients(&self) -> [f64; 6] {
        let m = &self.0;
        [
            m[(0, 0)],
            m[(1, 0)],
            m[(0, 1)],
            m[(1, 1)],
            m[(0, 2)],
            m[(1, 2)],
        ]
    }

    /// Replace the translation slots, leaving the linear part untouched.
    pub fn with_translation(mut self, tx: f64, ty: f64) -> Self {
        self.0[(0, 2)] = tx;
        self.0[(1, 2)] = ty;
        self
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|value| value.is_finite())
    }

    /// Render as `matrix(a, b, c, d, e, f)`, rounding to `precision` decimals when given.
    pub fn to_svg(&self, precision: Option<u32>) -> String {
        let parts: Vec<String> = self
            .coefficients()
            .iter()
            .map(|&value| format_number(value, precision))
            .collect();
        format!("matrix({})", parts.join(", "))
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Affine {
    type Output = Affine;

    fn mul(self, rhs: Affine) -> Affine {
        Affine(self.0 * rhs.0)
    }
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_svg(None))
    }
}

fn format_number(value: f64, precision: Option<u32>) -> String {
    let value = match precision {
        Some(decimals) => {
            let factor = 10_f64.powi(decimals.min(15) as i32);
            (value * factor).round() / factor
        }
        None => value,
    };
    // Avoid printing `-0`.
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value}")
}

/// Transform that renders `original` where `duplicate` is drawn.
///
/// `scale = duplicate size / original size` per axis and
/// `translate = duplicate position - scale * original position`. How any existing transform on
/// the duplicate (or the original) enters the result depends on `mode`.
pub fn clone_transform(
    original: &ImageGeometry,
    original_transform: Option<&str>,
    duplicate: &ImageGeometry,
    duplicate_transform: Option<&str>,
    mode: TransformMode,
) -> Result<Affine, TransformError> {
    let sx = duplicate.width / original.width;
    let sy = duplicate.height / original.height;
    let tx = duplicate.x - sx * original.x;
    let ty = duplicate.y - sy * original.y;

    let existing = duplicate_transform
        .map(Affine::parse)
        .transpose()?
        .unwrap_or_default();

    let combined = match mode {
        TransformMode::Legacy => (existing * Affine::scale(sx, sy)).with_translation(tx, ty),
        TransformMode::Composed => {
            // `<use>` renders the original with its own transform applied, so undo it first.
            let undo_original = match original_transform {
                Some(value) => Affine::parse(value)?.inverse().ok_or_else(|| {
                    TransformError::SingularOriginal {
                        value: value.to_owned(),
                    }
                })?,
                None => Affine::identity(),
            };
            existing * Affine::translate(tx, ty) * Affine::scale(sx, sy) * undo_original
        }
    };

    if !combined.is_finite() {
        return Err(TransformError::NonFinite);
    }
    Ok(combined)
}
