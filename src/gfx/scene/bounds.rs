//! # Bounding boxes and normalization
//!
//! World-space axis-aligned bounds over a set of objects, and the
//! recenter-and-rescale step that brings every asset into the same canonical
//! box before the cameras are placed.
//!
//! Normalization is box based: the union box of all objects is translated to
//! the origin and uniformly scaled so its largest side equals the target
//! size. It is equally valid for a single merged object and for several.

use cgmath::{Matrix4, Vector3, Vector4};

use super::object::Object;
use crate::error::NormalizeError;

/// Axis-aligned bounding box. `min <= max` componentwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Tight box around `points`, or `None` for an empty set.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Self::new(first.into(), first.into());
        for p in points {
            aabb.grow(Vector3::from(p));
        }
        Some(aabb)
    }

    fn grow(&mut self, p: Vector3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        out.grow(other.min);
        out.grow(other.max);
        out
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a.x, a.y, a.z),
            Vector3::new(b.x, a.y, a.z),
            Vector3::new(a.x, b.y, a.z),
            Vector3::new(a.x, a.y, b.z),
            Vector3::new(b.x, b.y, a.z),
            Vector3::new(b.x, a.y, b.z),
            Vector3::new(a.x, b.y, b.z),
            Vector3::new(b.x, b.y, b.z),
        ]
    }

    /// Box around the eight corners after applying `matrix`.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Aabb {
        let corners = self.corners().map(|c| {
            let h = matrix * Vector4::new(c.x, c.y, c.z, 1.0);
            [h.x / h.w, h.y / h.w, h.z / h.w]
        });
        // Eight corners are never empty.
        Self::from_points(corners).unwrap_or(*self)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn max_extent(&self) -> f32 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }
}

/// World-space box of every object's local bounds under its transform.
///
/// Returns `None` when no object carries geometry.
pub fn compute_world_bbox(objects: &[Object]) -> Option<Aabb> {
    objects
        .iter()
        .filter_map(|object| object.world_bounds())
        .reduce(|acc, b| acc.union(&b))
}

/// What [`normalize_objects`] did to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Largest side of the box before normalization, in asset units.
    pub original_max_dim: f32,
    /// Applied translation, the negated original box center.
    pub translation: Vector3<f32>,
    /// Applied uniform scale, always positive.
    pub scale: f32,
}

/// Recenters the union box of `objects` at the origin and scales it so its
/// largest side equals `target_size`.
///
/// Each transform becomes `S(scale) * T(-center) * transform`. Zero extent
/// aborts before any object is touched.
pub fn normalize_objects(
    objects: &mut [Object],
    target_size: f32,
) -> Result<Normalization, NormalizeError> {
    let bbox = compute_world_bbox(objects).ok_or(NormalizeError::Empty)?;
    let original_max_dim = bbox.max_extent();
    if original_max_dim <= 0.0 || !original_max_dim.is_finite() {
        return Err(NormalizeError::Degenerate(original_max_dim));
    }

    let translation = -bbox.center();
    let scale = target_size / original_max_dim;
    let correction = Matrix4::from_scale(scale) * Matrix4::from_translation(translation);
    for object in objects.iter_mut() {
        object.transform = correction * object.transform;
    }

    log::debug!(
        "normalized: max_dim={original_max_dim:.4} scale={scale:.4} center={:?}",
        bbox.center()
    );

    Ok(Normalization {
        original_max_dim,
        translation,
        scale,
    })
}
