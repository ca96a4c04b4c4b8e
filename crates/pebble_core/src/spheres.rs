//! Concentric level spheres around one center.

use crate::error::{ShapeError, ShapeResult};
use crate::mesh::TriangleMesh;
use anyhow::bail;
use nalgebra::Point3;
use std::ops::RangeInclusive;

/// `level_count` evenly spaced spheres between the closest and farthest point of
/// the mesh, followed by one guard sphere that encloses the whole mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereSequence {
    center: Point3<f64>,
    min_distance: f64,
    max_distance: f64,
    step: f64,
    radii: Vec<f64>,
}

impl SphereSequence {
    pub fn new(mesh: &TriangleMesh, center: Point3<f64>, level_count: usize) -> ShapeResult<Self> {
        let min_distance = mesh.min_distance(&center);
        let max_distance = mesh.max_distance(&center);
        Self::from_range(center, min_distance, max_distance, level_count)
    }

    pub fn from_range(
        center: Point3<f64>,
        min_distance: f64,
        max_distance: f64,
        level_count: usize,
    ) -> ShapeResult<Self> {
        let validate = || -> anyhow::Result<()> {
            if level_count == 0 {
                bail!("Level count must be at least 1.");
            }
            if !center.coords.iter().all(|c| c.is_finite()) {
                bail!("Sphere center must be finite.");
            }
            if !(max_distance > min_distance) || !min_distance.is_finite() || !max_distance.is_finite() {
                bail!(
                    "Distance range [{min_distance}, {max_distance}] is empty; the center sees the whole surface at one distance."
                );
            }
            Ok(())
        };
        validate().map_err(ShapeError::invalid_parameters)?;

        let step = (max_distance - min_distance) / (level_count + 1) as f64;
        let mut radii: Vec<f64> = (1..=level_count)
            .map(|i| min_distance + step * i as f64)
            .collect();
        radii.push(max_distance + step);

        Ok(Self {
            center,
            min_distance,
            max_distance,
            step,
            radii,
        })
    }

    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    /// Number of real spheres, excluding the guard.
    pub fn level_count(&self) -> usize {
        self.radii.len() - 1
    }

    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Radius of sphere `index`; `index == level_count()` is the guard sphere.
    pub fn radius(&self, index: usize) -> f64 {
        self.radii[index]
    }

    /// Spheres that may cut the face. The last one always contains the whole face.
    pub fn face_levels(&self, mesh: &TriangleMesh, face: usize) -> RangeInclusive<usize> {
        let (near, far) = mesh.face_distance_range(&self.center, face);
        let n = self.level_count();
        let index = |d: f64| (((d - self.min_distance) / self.step).floor().max(0.0) as usize).min(n);
        let mut first = index(near);
        let mut last = index(far).max(first);
        // Rounding can put the face on the wrong side of a boundary sphere.
        while last < n && far >= self.radii[last] {
            last += 1;
        }
        while first < last && near >= self.radii[first] {
            first += 1;
        }
        first..=last
    }
}
