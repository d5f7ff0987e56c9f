//! Rotated square regions of interest.
//!
//! # Coordinates
//!
//! All coordinates handled here are normalized: `(0, 0)` is the top left corner of the (square)
//! image and `(1, 1)` the bottom right corner. Y points *down*. Angles are in radians, and a
//! positive angle rotates the region clockwise on screen.
//!
//! The *local* coordinate system of a [`Roi`] is normalized the same way, but relative to the
//! rotated square itself: `(0.5, 0.5)` is the ROI's center and `(0, 0)` is the corner that ends
//! up top left after undoing the rotation.

use std::fmt;

use itertools::{Itertools, MinMaxResult};
use nalgebra::{Point2, Rotation2, Vector2};

use crate::num::normalize_radians;

/// The smallest side length a [`Roi`] can have.
///
/// Degenerate landmark sets (eg. all points on a line) would otherwise produce an empty region.
pub const MIN_ROI_SIZE: f32 = 1e-4;

/// A rotated square region of interest.
#[derive(Clone, Copy, PartialEq)]
pub struct Roi {
    center: Point2<f32>,
    size: f32,
    radians: f32,
}

impl Roi {
    /// Creates a new region of interest.
    ///
    /// `radians` is normalized into `(-π, π]`, and `size` is clamped to [`MIN_ROI_SIZE`].
    pub fn new(x_center: f32, y_center: f32, size: f32, radians: f32) -> Self {
        let size = if size >= MIN_ROI_SIZE {
            size
        } else {
            log::debug!("degenerate ROI size {size}, clamping to {MIN_ROI_SIZE}");
            MIN_ROI_SIZE
        };
        Self {
            center: Point2::new(x_center, y_center),
            size,
            radians: normalize_radians(radians),
        }
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.center
    }

    /// Returns the side length of the square.
    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Returns the clockwise rotation in radians, in range `(-π, π]`.
    #[inline]
    pub fn rotation_radians(&self) -> f32 {
        self.radians
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.radians.to_degrees()
    }

    /// Maps a point from the ROI's local coordinate system into the image.
    pub fn to_image(&self, local: [f32; 2]) -> [f32; 2] {
        let rel = Vector2::new(local[0] - 0.5, local[1] - 0.5) * self.size;
        let p = self.center + Rotation2::new(self.radians) * rel;
        [p.x, p.y]
    }

    /// Maps a point from the image into the ROI's local coordinate system.
    ///
    /// This is the inverse of [`Roi::to_image`].
    pub fn to_local(&self, image: [f32; 2]) -> [f32; 2] {
        let rel = Point2::new(image[0], image[1]) - self.center;
        let p = Rotation2::new(self.radians).inverse() * rel / self.size;
        [p.x + 0.5, p.y + 0.5]
    }

    /// Returns the corners of the ROI in image coordinates.
    ///
    /// The order is: top-left, top-right, bottom-right, bottom-left, as seen from inside the ROI.
    pub fn corners(&self) -> [[f32; 2]; 4] {
        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]].map(|p| self.to_image(p))
    }
}

impl fmt::Debug for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Roi @ ({:.4},{:.4}) size={:.4} rot={:.1}deg",
            self.center.x,
            self.center.y,
            self.size,
            self.rotation_degrees(),
        )
    }
}

/// A rotated, not necessarily square, bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedBounds {
    pub center: Point2<f32>,
    /// Extent along the rotated X axis.
    pub width: f32,
    /// Extent along the rotated Y axis.
    pub height: f32,
    pub radians: f32,
}

impl RotatedBounds {
    /// Computes the bounding box of `points` in a frame rotated clockwise by `radians`.
    ///
    /// The points are first centered on their axis-aligned bounding box and then projected onto
    /// the rotated axes. Centering first keeps the projection free of the bias introduced by the
    /// points' distance from the image origin.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn bounding<I>(radians: f32, points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f32; 2]>,
        I::IntoIter: Clone,
    {
        let points = points.into_iter();
        let (x_min, x_max) = min_max(points.clone().map(|p| p[0]))?;
        let (y_min, y_max) = min_max(points.clone().map(|p| p[1]))?;
        let aa_center = Vector2::new(0.5 * (x_min + x_max), 0.5 * (y_min + y_max));

        let rot = Rotation2::new(radians);
        let inv = rot.inverse();
        let projected = points.map(|p| inv * (Vector2::new(p[0], p[1]) - aa_center));
        let (px_min, px_max) = min_max(projected.clone().map(|p| p.x))?;
        let (py_min, py_max) = min_max(projected.map(|p| p.y))?;

        let projected_center = Vector2::new(0.5 * (px_min + px_max), 0.5 * (py_min + py_max));
        let center = rot * projected_center + aa_center;

        Some(Self {
            center: Point2::from(center),
            width: px_max - px_min,
            height: py_max - py_min,
            radians,
        })
    }
}

fn min_max(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    match values.minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_abs_diff_eq;

    use super::*;

    #[track_caller]
    fn assert_point_eq(a: [f32; 2], b: [f32; 2], epsilon: f32) {
        assert!(
            (a[0] - b[0]).abs() <= epsilon && (a[1] - b[1]).abs() <= epsilon,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn unrotated_transform() {
        let roi = Roi::new(0.5, 0.5, 0.5, 0.0);
        assert_eq!(roi.to_image([0.5, 0.5]), [0.5, 0.5]);
        assert_eq!(roi.to_image([0.0, 0.0]), [0.25, 0.25]);
        assert_eq!(roi.to_image([1.0, 1.0]), [0.75, 0.75]);
        assert_eq!(roi.to_local([0.25, 0.75]), [0.0, 1.0]);
    }

    #[test]
    fn rotated_transform() {
        // Rotated clockwise by 90°: the local X axis points down in the image.
        let roi = Roi::new(0.5, 0.5, 1.0, FRAC_PI_2);
        assert_point_eq(roi.to_image([1.0, 0.5]), [0.5, 1.0], 1e-6);
        assert_point_eq(roi.to_image([0.5, 0.0]), [1.0, 0.5], 1e-6);
        assert_point_eq(roi.to_image([0.0, 0.0]), [1.0, 0.0], 1e-6);
        assert_point_eq(roi.to_local([1.0, 0.0]), [0.0, 0.0], 1e-6);
    }

    #[test]
    fn round_trip() {
        let mut rng = fastrand::Rng::with_seed(1234);
        for _ in 0..1000 {
            let roi = Roi::new(
                rng.f32(),
                rng.f32(),
                0.01 + rng.f32(),
                (rng.f32() - 0.5) * 4.0 * PI,
            );
            let local = [rng.f32() * 1.5 - 0.25, rng.f32() * 1.5 - 0.25];
            let back = roi.to_local(roi.to_image(local));
            assert_point_eq(back, local, 1e-4);

            let image = [rng.f32(), rng.f32()];
            let back = roi.to_image(roi.to_local(image));
            assert_point_eq(back, image, 1e-4);
        }
    }

    #[test]
    fn invariants() {
        let roi = Roi::new(0.0, 0.0, 0.0, 3.0 * PI);
        assert_eq!(roi.size(), MIN_ROI_SIZE);
        assert!(roi.rotation_radians() > -PI && roi.rotation_radians() <= PI);

        let roi = Roi::new(0.0, 0.0, -1.0, -PI);
        assert_eq!(roi.size(), MIN_ROI_SIZE);
        assert_abs_diff_eq!(roi.rotation_radians(), PI);
    }

    #[test]
    fn corners() {
        let roi = Roi::new(0.5, 0.5, 0.5, 0.0);
        assert_eq!(
            roi.corners(),
            [[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.75]]
        );
    }

    #[test]
    fn bounds() {
        assert!(RotatedBounds::bounding(0.0, []).is_none());

        let b = RotatedBounds::bounding(0.0, [[0.25, 0.25], [0.75, 0.5]]).unwrap();
        assert_eq!(b.center, Point2::new(0.5, 0.375));
        assert_eq!(b.width, 0.5);
        assert_eq!(b.height, 0.25);

        // A single point has no extent.
        let b = RotatedBounds::bounding(1.0, [[0.3, 0.3]]).unwrap();
        assert_eq!(b.width, 0.0);
        assert_eq!(b.height, 0.0);

        // Rotating by 90° swaps width and height.
        let b = RotatedBounds::bounding(FRAC_PI_2, [[0.25, 0.25], [0.75, 0.5]]).unwrap();
        assert_abs_diff_eq!(b.width, 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(b.height, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(b.center.x, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(b.center.y, 0.375, epsilon = 1e-6);
    }
}
