//! Bulk measurements of a mesh and the dimensionless shape ratios derived from them.

use crate::mesh::TriangleMesh;
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::PI;

/// Exponent of the Knud Thomsen approximation of the ellipsoid surface.
const ELLIPSOID_P: f64 = 1.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshMeasurements {
    pub surface_area: f64,
    pub volume: f64,
    pub bounding_box: BoundingBox,
    /// Longest vertex-to-vertex distance.
    pub a: f64,
    /// Longest distance after projecting onto the plane orthogonal to `a`.
    pub b: f64,
    /// Extent along `a x b`.
    pub c: f64,
    pub projected_circumference: f64,
    pub projected_area: f64,
    pub ratios: ShapeRatios,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeRatios {
    pub c_over_a: f64,
    pub b_over_a: f64,
    pub i_body: f64,
    pub i_proj: f64,
    pub i_ellipsoid: f64,
    pub i_ellipse: f64,
}

impl ShapeRatios {
    pub const LABELS: [&'static str; 6] = ["c/a", "b/a", "Ibody", "Iproj", "Iellipsoid", "Iellipse"];

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.c_over_a,
            self.b_over_a,
            self.i_body,
            self.i_proj,
            self.i_ellipsoid,
            self.i_ellipse,
        ]
    }
}

impl MeshMeasurements {
    /// Measures the mesh. The principal extents compare every vertex pair, so this
    /// is quadratic in the vertex count and meant to run once per mesh.
    pub fn of(mesh: &TriangleMesh) -> Self {
        let positions = mesh.positions();

        let surface_area = mesh.surface_area();
        let volume = enclosed_volume(mesh);

        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        let a_vec = farthest_pair(positions.iter().map(|p| p.coords));
        let a_len = a_vec.norm();
        let a_dir = normalize_or(a_vec, Vector3::x());

        let flatten = |v: Vector3<f64>| v - a_dir * a_dir.dot(&v);
        let b_vec = farthest_pair(positions.iter().map(|p| flatten(p.coords)));
        let b_len = b_vec.norm();
        let b_dir = normalize_or(b_vec, any_orthogonal(&a_dir));

        let c_dir = a_dir.cross(&b_dir);
        let (lo, hi) = positions.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            let t = c_dir.dot(&p.coords);
            (lo.min(t), hi.max(t))
        });
        let c_len = (hi - lo).max(0.0);

        let projected: Vec<Point2<f64>> = positions
            .iter()
            .map(|p| Point2::new(a_dir.dot(&p.coords), b_dir.dot(&p.coords)))
            .collect();
        let outline = convex_hull_2d(projected);
        let projected_circumference = polygon_perimeter(&outline);
        let projected_area = polygon_area(&outline).abs();

        let ratios = ShapeRatios::compute(
            surface_area,
            volume,
            a_len,
            b_len,
            c_len,
            projected_circumference,
            projected_area,
        );

        Self {
            surface_area,
            volume,
            bounding_box: BoundingBox { min, max },
            a: a_len,
            b: b_len,
            c: c_len,
            projected_circumference,
            projected_area,
            ratios,
        }
    }
}

impl ShapeRatios {
    pub fn compute(
        surface_area: f64,
        volume: f64,
        a: f64,
        b: f64,
        c: f64,
        projected_circumference: f64,
        projected_area: f64,
    ) -> Self {
        let ellipsoid_volume = 4.0 / 3.0 * PI * a * b * c;
        let (ap, bp, cp) = (a.powf(ELLIPSOID_P), b.powf(ELLIPSOID_P), c.powf(ELLIPSOID_P));
        let ellipsoid_area = 4.0 * PI * ((ap * bp + ap * cp + bp * cp) / 3.0).powf(1.0 / ELLIPSOID_P);
        // Ramanujan's first approximation.
        let ellipse_circumference =
            PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt());
        let ellipse_area = PI * a * b;

        Self {
            c_over_a: c / a,
            b_over_a: b / a,
            i_body: isoperimetric_3d(volume, surface_area),
            i_proj: isoperimetric_2d(projected_area, projected_circumference),
            i_ellipsoid: isoperimetric_3d(ellipsoid_volume, ellipsoid_area),
            i_ellipse: isoperimetric_2d(ellipse_area, ellipse_circumference),
        }
    }
}

/// Volume bounded by a closed mesh, from signed tetrahedra against its centroid.
pub fn enclosed_volume(mesh: &TriangleMesh) -> f64 {
    let origin = mesh.centroid();
    (0..mesh.face_count())
        .map(|f| {
            let [p, q, r] = mesh.face_corners(f).map(|x| x - origin);
            p.dot(&q.cross(&r)) / 6.0
        })
        .sum::<f64>()
        .abs()
}

fn isoperimetric_3d(volume: f64, area: f64) -> f64 {
    36.0 * PI * volume.powi(2) / area.powi(3)
}

fn isoperimetric_2d(area: f64, circumference: f64) -> f64 {
    4.0 * PI * area / circumference.powi(2)
}

fn farthest_pair(points: impl Iterator<Item = Vector3<f64>>) -> Vector3<f64> {
    let points: Vec<Vector3<f64>> = points.collect();
    let mut best = Vector3::zeros();
    let mut best_sq = 0.0;
    for (i, p) in points.iter().enumerate() {
        for q in &points[i + 1..] {
            let d = q - p;
            let sq = d.norm_squared();
            if sq > best_sq {
                best_sq = sq;
                best = d;
            }
        }
    }
    best
}

fn normalize_or(v: Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(1e-300).unwrap_or(fallback)
}

fn any_orthogonal(v: &Vector3<f64>) -> Vector3<f64> {
    let helper = if v.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    normalize_or(v.cross(&helper), Vector3::z())
}

/// Andrew's monotone chain; counter-clockwise, without repeating the first point.
pub fn convex_hull_2d(mut points: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    points.sort_by(|p, q| {
        p.x.partial_cmp(&q.x)
            .unwrap_or(Ordering::Equal)
            .then(p.y.partial_cmp(&q.y).unwrap_or(Ordering::Equal))
    });
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let turn = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };
    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(points.len() * 2);
    for p in &points {
        while hull.len() >= 2 && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

fn polygon_perimeter(polygon: &[Point2<f64>]) -> f64 {
    if polygon.len() < 2 {
        return 0.0;
    }
    polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(p, q)| (q - p).norm())
        .sum()
}

fn polygon_area(polygon: &[Point2<f64>]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    0.5 * polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(p, q)| p.x * q.y - p.y * q.x)
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::{convex_hull_2d, MeshMeasurements, ShapeRatios};
    use crate::mesh::fixtures::{cuboid, tetrahedron, uv_sphere};
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    #[test]
    fn cube_measurements() {
        let m = MeshMeasurements::of(&cuboid(0.5, 0.5, 0.5));
        assert_relative_eq!(m.surface_area, 6.0, epsilon = 1e-12);
        assert_relative_eq!(m.volume, 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.a, 3f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(m.bounding_box.min[0], -0.5);
        assert_relative_eq!(m.bounding_box.max[2], 0.5);
        assert!(m.b <= m.a && m.c <= m.a + 1e-12);
        assert!(m.ratios.i_body < 1.0 && m.ratios.i_body > 0.5);
    }

    #[test]
    fn box_extents_follow_the_long_axis() {
        let m = MeshMeasurements::of(&cuboid(4.0, 1.0, 0.25));
        // The diagonal is the longest chord; c stays the thinnest extent.
        assert_relative_eq!(m.a, (64.0f64 + 4.0 + 0.25).sqrt(), epsilon = 1e-12);
        assert!(m.c < m.b && m.b < m.a, "unexpected extents {} {} {}", m.a, m.b, m.c);
        assert!(m.ratios.c_over_a < m.ratios.b_over_a);
    }

    #[test]
    fn sphere_is_nearly_isoperimetric() {
        let m = MeshMeasurements::of(&uv_sphere(1.0, 24, 48));
        assert!(m.ratios.i_body > 0.97 && m.ratios.i_body <= 1.0, "Ibody {}", m.ratios.i_body);
        assert!(m.ratios.i_proj > 0.98 && m.ratios.i_proj <= 1.0, "Iproj {}", m.ratios.i_proj);
        assert_relative_eq!(m.ratios.i_ellipsoid, 1.0, epsilon = 0.05);
    }

    #[test]
    fn tetrahedron_is_far_from_a_sphere() {
        let m = MeshMeasurements::of(&tetrahedron());
        assert!(m.ratios.i_body < 0.4, "Ibody {}", m.ratios.i_body);
        assert_eq!(m.ratios.to_vec().len(), ShapeRatios::LABELS.len());
    }

    #[test]
    fn ellipse_quotient_of_circle_is_one() {
        let r = ShapeRatios::compute(1.0, 1.0, 2.0, 2.0, 2.0, 1.0, 1.0);
        assert_relative_eq!(r.i_ellipse, 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.i_ellipsoid, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn hull_drops_interior_points() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 0.5),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.0),
        ];
        let hull = convex_hull_2d(points);
        assert_eq!(hull.len(), 4, "hull {hull:?}");
    }
}
