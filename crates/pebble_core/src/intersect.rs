//! Sphere/triangle intersection.
//!
//! A sphere cuts the supporting plane of a face in a circle. Walking the face
//! boundary counter-clockwise, every maximal stretch outside the sphere starts at
//! an exit crossing and ends at an enter crossing; the circle closes it into one
//! [`Arc`]. Corners met along the stretch are the arc's enclosed corners.

use crate::mesh::TriangleMesh;
use crate::spheres::SphereSequence;
use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Circle {
    pub center: Point3<f64>,
    pub radius: f64,
    pub normal: Vector3<f64>,
}

/// A point where a face edge crosses a sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crossing {
    pub halfedge: usize,
    pub point: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arc {
    pub face: usize,
    /// `None` for the null arc that opens the first region of a face.
    pub sphere: Option<usize>,
    pub circle: Option<Circle>,
    /// Exit crossing of the outside stretch.
    pub source: Option<Crossing>,
    /// Enter crossing of the outside stretch.
    pub target: Option<Crossing>,
    /// Face corners (0..3) on the far side of the arc, in boundary order.
    pub enclosed: Vec<usize>,
    pub angle: f64,
    pub length: f64,
    /// Area between the arc and its chord.
    pub area: f64,
}

impl Arc {
    pub fn null(face: usize) -> Self {
        Self {
            face,
            sphere: None,
            circle: None,
            source: None,
            target: None,
            enclosed: vec![0, 1, 2],
            angle: 0.0,
            length: 0.0,
            area: 0.0,
        }
    }

    fn full_circle(face: usize, sphere: usize, circle: Circle) -> Self {
        Self::with_angle(face, sphere, circle, None, TAU, vec![0, 1, 2])
    }

    fn between(
        face: usize,
        sphere: usize,
        circle: Circle,
        source: Crossing,
        target: Crossing,
        enclosed: Vec<usize>,
    ) -> Self {
        let u = source.point - circle.center;
        let v = target.point - circle.center;
        let mut angle = circle.normal.dot(&u.cross(&v)).atan2(u.dot(&v));
        if angle <= 0.0 {
            angle += TAU;
        }
        Self::with_angle(face, sphere, circle, Some((source, target)), angle, enclosed)
    }

    fn with_angle(
        face: usize,
        sphere: usize,
        circle: Circle,
        endpoints: Option<(Crossing, Crossing)>,
        angle: f64,
        enclosed: Vec<usize>,
    ) -> Self {
        let r = circle.radius;
        Self {
            face,
            sphere: Some(sphere),
            circle: Some(circle),
            source: endpoints.map(|(s, _)| s),
            target: endpoints.map(|(_, t)| t),
            enclosed,
            angle,
            length: r * angle,
            area: 0.5 * r * r * (angle - angle.sin()),
        }
    }

    pub fn is_null(&self) -> bool {
        self.circle.is_none()
    }

    pub fn endpoints(&self) -> Option<(Crossing, Crossing)> {
        self.source.zip(self.target)
    }

    pub fn encloses(&self, corner: usize) -> bool {
        self.enclosed.contains(&corner)
    }

    /// Points used to compare the positions of two arcs.
    pub fn anchor_points(&self) -> Vec<Point3<f64>> {
        match (self.endpoints(), self.circle) {
            (Some((s, t)), _) => vec![s.point, t.point],
            (None, Some(circle)) => vec![circle.center],
            (None, None) => Vec::new(),
        }
    }
}

/// Per-face data reused across every sphere of a sequence.
pub struct FaceSlicer {
    face: usize,
    vertices: [u32; 3],
    corners: [Point3<f64>; 3],
    distances: [f64; 3],
    normal: Vector3<f64>,
    center: Point3<f64>,
}

enum Event {
    Corner(usize),
    Crossing(Crossing),
}

impl FaceSlicer {
    pub fn new(mesh: &TriangleMesh, face: usize, center: Point3<f64>) -> Self {
        let vertices = mesh.face(face);
        let corners = mesh.face_corners(face);
        let distances = vertices.map(|v| mesh.vertex_distance(&center, v));
        Self {
            face,
            vertices,
            corners,
            distances,
            normal: mesh.face_normal(face),
            center,
        }
    }

    pub fn face(&self) -> usize {
        self.face
    }

    pub fn corner(&self, corner: usize) -> Point3<f64> {
        self.corners[corner]
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Arcs cut from this face by sphere `sphere` of radius `radius`.
    pub fn arcs(&self, sphere: usize, radius: f64) -> Vec<Arc> {
        let offset = self.normal.dot(&(self.center - self.corners[0]));
        let squared = radius * radius - offset * offset;
        if squared <= 0.0 {
            return Vec::new();
        }
        let circle = Circle {
            center: self.center - self.normal * offset,
            radius: squared.sqrt(),
            normal: self.normal,
        };

        let outside = self.distances.map(|d| d > radius);
        if !outside.iter().any(|&o| o) {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(9);
        let mut crossing_count = 0;
        for k in 0..3 {
            events.push(Event::Corner(k));
            for point in self.edge_crossings(k, radius, &outside) {
                events.push(Event::Crossing(Crossing {
                    halfedge: TriangleMesh::halfedge(self.face, k),
                    point,
                }));
                crossing_count += 1;
            }
        }

        if crossing_count == 0 {
            if self.contains_in_plane(&circle.center) {
                return vec![Arc::full_circle(self.face, sphere, circle)];
            }
            return Vec::new();
        }

        // Crossings alternate between leaving and entering the ball.
        let mut exits = Vec::with_capacity(events.len());
        let mut inside = !outside[0];
        for event in &events {
            if let Event::Crossing(_) = event {
                exits.push(inside);
                inside = !inside;
            } else {
                exits.push(false);
            }
        }
        let Some(start) = events
            .iter()
            .zip(&exits)
            .position(|(event, &exit)| matches!(event, Event::Crossing(_)) && exit)
        else {
            return Vec::new();
        };

        let mut arcs = Vec::new();
        let mut source: Option<Crossing> = None;
        let mut enclosed = Vec::with_capacity(3);
        for step in 0..events.len() {
            let index = (start + step) % events.len();
            match &events[index] {
                Event::Crossing(crossing) if exits[index] => {
                    source = Some(*crossing);
                    enclosed.clear();
                }
                Event::Crossing(crossing) => {
                    if let Some(from) = source.take() {
                        arcs.push(Arc::between(
                            self.face,
                            sphere,
                            circle,
                            from,
                            *crossing,
                            std::mem::take(&mut enclosed),
                        ));
                    }
                }
                Event::Corner(k) => {
                    if source.is_some() {
                        enclosed.push(*k);
                    }
                }
            }
        }
        arcs
    }

    /// Crossings of edge `k` (corner `k` to corner `k + 1`), ordered along the edge.
    /// Evaluated from the lower vertex id so both faces of an edge agree exactly.
    fn edge_crossings(&self, k: usize, radius: f64, outside: &[bool; 3]) -> Vec<Point3<f64>> {
        let next = (k + 1) % 3;
        let (a, b, flipped) = if self.vertices[k] < self.vertices[next] {
            (k, next, false)
        } else {
            (next, k, true)
        };
        let origin = self.corners[a];
        let direction = self.corners[b] - origin;
        let w = origin - self.center;
        let qa = direction.norm_squared();
        let qb = 2.0 * direction.dot(&w);
        let qc = w.norm_squared() - radius * radius;
        let disc = qb * qb - 4.0 * qa * qc;

        let lower = || ((-qb - disc.max(0.0).sqrt()) / (2.0 * qa)).clamp(0.0, 1.0);
        let upper = || ((-qb + disc.max(0.0).sqrt()) / (2.0 * qa)).clamp(0.0, 1.0);
        let params: Vec<f64> = match (outside[a], outside[b]) {
            (true, false) => vec![lower()],
            (false, true) => vec![upper()],
            (true, true) if disc > 0.0 => {
                let (t0, t1) = (lower(), upper());
                if t0 > 0.0 && t1 < 1.0 && t0 < t1 {
                    vec![t0, t1]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        };

        let mut points: Vec<Point3<f64>> = params.into_iter().map(|t| origin + direction * t).collect();
        if flipped {
            points.reverse();
        }
        points
    }

    fn contains_in_plane(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|k| {
            let a = self.corners[k];
            let b = self.corners[(k + 1) % 3];
            self.normal.dot(&(b - a).cross(&(point - a))) >= 0.0
        })
    }
}

/// Arcs of one face on one sphere of the sequence.
pub fn intersect_face(
    mesh: &TriangleMesh,
    spheres: &SphereSequence,
    face: usize,
    sphere: usize,
) -> Vec<Arc> {
    FaceSlicer::new(mesh, face, spheres.center()).arcs(sphere, spheres.radius(sphere))
}
