/// Linear extrusion of sketch profiles
///
/// Sweeps a closed sketch profile along the sketch normal to build a prism:
/// two ear-clipped caps plus one quad (two triangles) per profile edge. The
/// sweep runs along +Z in the sketch frame and is then rotated so the solid
/// stands on the XZ ground plane with Y up, the convention of the viewer.

use nalgebra::Point3;
use tracing::debug;

use crate::config::GEOMETRY_EPSILON;
use crate::error::{Error, Result};
use crate::geometry::{Mesh, Triangle};
use crate::normalize::Profile;
use crate::polygon::{signed_area, Point2D};
use crate::transform::{RotationState, Transform};

/// Extrude `profile` by `depth` grid units.
///
/// A negative depth sweeps the other way; normals stay outward either way.
/// Holes are not supported and self-intersecting profiles are rejected.
pub fn extrude(profile: &Profile, depth: f32) -> Result<Mesh> {
    if depth == 0.0 || !depth.is_finite() {
        return Err(Error::InvalidDepth { depth });
    }

    let tolerance = area_tolerance(profile.vertices());
    let mut ring = distinct_ring(profile.vertices());
    if ring.len() < 3 {
        return Err(Error::degenerate(format!(
            "only {} distinct vertices",
            ring.len()
        )));
    }

    let area = signed_area(&ring);
    if area.abs() <= tolerance {
        return Err(Error::degenerate("profile has zero area"));
    }
    if area < 0.0 {
        ring.reverse();
    }
    if let Some((a, b)) = find_self_intersection(&ring, tolerance) {
        return Err(Error::degenerate(format!(
            "edges {a} and {b} intersect"
        )));
    }

    let cap = triangulate(&ring, tolerance)?;
    let n = ring.len();
    let at = |i: usize, z: f32| Point3::new(ring[i].x as f32, ring[i].y as f32, z);
    let mut mesh = Mesh::with_capacity(2 * n + 2 * cap.len());
    let mut emit = |v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>| {
        // Mirroring the sweep mirrors the windings too.
        let triangle = Triangle::new(v0, v1, v2);
        mesh.add_triangle(if depth > 0.0 { triangle } else { triangle.flipped() });
    };

    // Far cap keeps the CCW winding, near cap faces the other way.
    for &[a, b, c] in &cap {
        emit(at(a, depth), at(b, depth), at(c, depth));
        emit(at(a, 0.0), at(c, 0.0), at(b, 0.0));
    }

    // Side walls, one quad per edge
    for i in 0..n {
        let j = (i + 1) % n;
        let (a0, b0, b1, a1) = (at(i, 0.0), at(j, 0.0), at(j, depth), at(i, depth));
        emit(a0, b0, b1);
        emit(a0, b1, a1);
    }

    let rotation = Transform::rotation_matrix(&RotationState::SWEEP_TO_Y_UP);
    let mesh = Transform::apply(&mesh, &rotation);

    debug!(
        vertices = n,
        depth,
        triangles = mesh.len(),
        "extruded profile"
    );
    Ok(mesh)
}

/// Area tolerance scaled to the profile's extent.
fn area_tolerance(points: &[Point2D]) -> f64 {
    let extent = points
        .iter()
        .flat_map(|p| [p.x.abs(), p.y.abs()])
        .fold(1.0_f64, f64::max);
    GEOMETRY_EPSILON * extent * extent
}

/// Twice the signed area of `a, b, c`; positive when they turn left.
fn cross(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Drop repeated vertices and the closing duplicate. Every remaining vertex
/// gets its own wall edge, collinear ones included.
fn distinct_ring(vertices: &[Point2D]) -> Vec<Point2D> {
    let mut ring: Vec<Point2D> = Vec::with_capacity(vertices.len());
    for &p in vertices {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Whether the corner at `i` turns by less than `tolerance`.
fn is_flat(ring: &[Point2D], i: usize, tolerance: f64) -> bool {
    let n = ring.len();
    cross(ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]).abs() <= tolerance
}

/// First pair of non-adjacent edges that touch or cross.
fn find_self_intersection(ring: &[Point2D], tolerance: f64) -> Option<(usize, usize)> {
    let n = ring.len();
    let edge = |i: usize| (ring[i], ring[(i + 1) % n]);
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (p1, p2) = edge(i);
            let (q1, q2) = edge(j);
            if segments_intersect(p1, p2, q1, q2, tolerance) {
                return Some((i, j));
            }
        }
    }
    None
}

fn segments_intersect(p1: Point2D, p2: Point2D, q1: Point2D, q2: Point2D, tolerance: f64) -> bool {
    let sign = |v: f64| {
        if v > tolerance {
            1
        } else if v < -tolerance {
            -1
        } else {
            0
        }
    };
    let d1 = sign(cross(q1, q2, p1));
    let d2 = sign(cross(q1, q2, p2));
    let d3 = sign(cross(p1, p2, q1));
    let d4 = sign(cross(p1, p2, q2));

    if d1 * d2 < 0 && d3 * d4 < 0 {
        return true;
    }
    (d1 == 0 && on_segment(q1, q2, p1))
        || (d2 == 0 && on_segment(q1, q2, p2))
        || (d3 == 0 && on_segment(p1, p2, q1))
        || (d4 == 0 && on_segment(p1, p2, q2))
}

/// `p` is already known to be collinear with `a, b`.
fn on_segment(a: Point2D, b: Point2D, p: Point2D) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn point_in_triangle(p: Point2D, a: Point2D, b: Point2D, c: Point2D, tolerance: f64) -> bool {
    cross(a, b, p) >= -tolerance && cross(b, c, p) >= -tolerance && cross(c, a, p) >= -tolerance
}

/// Ear-clip a counter-clockwise simple ring into CCW index triples.
///
/// Collinear vertices lie on a cap edge and are left out of the caps, so no
/// cap triangle is flat.
fn triangulate(ring: &[Point2D], tolerance: f64) -> Result<Vec<[usize; 3]>> {
    let mut remaining: Vec<usize> = (0..ring.len())
        .filter(|&i| !is_flat(ring, i, tolerance))
        .collect();
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));

    while remaining.len() > 3 {
        let n = remaining.len();
        let corner = |i: usize| {
            (
                remaining[(i + n - 1) % n],
                remaining[i],
                remaining[(i + 1) % n],
            )
        };
        let is_ear = |i: usize| {
            let (a, b, c) = corner(i);
            let (pa, pb, pc) = (ring[a], ring[b], ring[c]);
            cross(pa, pb, pc) > tolerance
                && remaining
                    .iter()
                    .filter(|&&k| k != a && k != b && k != c)
                    .all(|&k| !point_in_triangle(ring[k], pa, pb, pc, tolerance))
        };

        if let Some(i) = (0..n).find(|&i| is_ear(i)) {
            let (a, b, c) = corner(i);
            triangles.push([a, b, c]);
            remaining.remove(i);
            continue;
        }

        // Clipping can leave a flat vertex behind; it contributes no area.
        let flat = (0..n).find(|&i| {
            let (a, b, c) = corner(i);
            cross(ring[a], ring[b], ring[c]).abs() <= tolerance
        });
        match flat {
            Some(i) => {
                remaining.remove(i);
            }
            None => return Err(Error::degenerate("profile could not be triangulated")),
        }
    }

    if let [a, b, c] = remaining[..] {
        if cross(ring[a], ring[b], ring[c]) > tolerance {
            triangles.push([a, b, c]);
        }
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Aabb;
    use crate::normalize::normalize;
    use crate::polygon::Polygon;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn profile(coords: &[(f64, f64)]) -> Profile {
        let points = coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect();
        normalize(&Polygon::from_points(points)).unwrap()
    }

    /// Divergence theorem: positive only when every normal points outward.
    fn signed_volume(mesh: &Mesh) -> f32 {
        mesh.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.vertices.map(|v| v.coords);
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    fn cap_area(mesh: &Mesh, y: f32) -> f32 {
        mesh.triangles
            .iter()
            .filter(|t| t.vertices.iter().all(|v| (v.y - y).abs() < 1e-4))
            .map(Triangle::area)
            .sum()
    }

    #[test]
    fn test_rectangle_prism() {
        let rect = profile(&[(10.0, 10.0), (50.0, 10.0), (50.0, 30.0), (10.0, 30.0)]);
        let mesh = extrude(&rect, 20.0).unwrap();

        // 4 edges -> 8 wall triangles, 2 caps of 2 triangles
        assert_eq!(mesh.len(), 12);
        let bounds: Aabb = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.min, Point3::new(-20.0, 0.0, -10.0), epsilon = 1e-4);
        assert_relative_eq!(bounds.max, Point3::new(20.0, 20.0, 10.0), epsilon = 1e-4);
        assert_relative_eq!(signed_volume(&mesh), 40.0 * 20.0 * 20.0, max_relative = 1e-4);
        assert!(mesh.validate().unwrap().degenerate.is_empty());
    }

    #[test]
    fn test_negative_depth_keeps_normals_outward() {
        let rect = profile(&[(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (0.0, 2.0)]);
        let mesh = extrude(&rect, -3.0).unwrap();

        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.min.y, -3.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(signed_volume(&mesh), 24.0, max_relative = 1e-4);
    }

    #[test]
    fn test_clockwise_profile_is_reoriented() {
        let cw = profile(&[(0.0, 0.0), (0.0, 2.0), (4.0, 2.0), (4.0, 0.0)]);
        assert!(cw.signed_area() < 0.0);
        let mesh = extrude(&cw, 1.0).unwrap();
        assert_relative_eq!(signed_volume(&mesh), 8.0, max_relative = 1e-4);
    }

    #[test]
    fn test_concave_l_shape() {
        let l = profile(&[
            (0.0, 0.0),
            (40.0, 0.0),
            (40.0, 10.0),
            (10.0, 10.0),
            (10.0, 30.0),
            (0.0, 30.0),
        ]);
        let mesh = extrude(&l, 5.0).unwrap();

        assert_eq!(mesh.len(), 2 * 6 + 2 * 4);
        assert_relative_eq!(cap_area(&mesh, 5.0), 600.0, max_relative = 1e-4);
        assert_relative_eq!(cap_area(&mesh, 0.0), 600.0, max_relative = 1e-4);
        assert_relative_eq!(signed_volume(&mesh), 3000.0, max_relative = 1e-4);
        assert!(mesh.triangles.iter().all(|t| !t.is_degenerate()));
    }

    /// Side walls are the only triangles with a horizontal normal.
    fn wall_count(mesh: &Mesh) -> usize {
        mesh.triangles.iter().filter(|t| t.normal.y.abs() < 1e-4).count()
    }

    #[test]
    fn test_repeated_vertices_are_merged_and_collinear_ones_kept() {
        let rect = profile(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 0.0),
            (4.0, 0.0),
            (4.0, 2.0),
            (0.0, 2.0),
        ]);
        let mesh = extrude(&rect, 1.0).unwrap();

        // 5 distinct vertices -> 10 walls, caps only need the 4 corners
        assert_eq!(wall_count(&mesh), 10);
        assert_eq!(mesh.len(), 10 + 2 * 2);
        assert!(mesh.triangles.iter().all(|t| !t.is_degenerate()));
        assert_relative_eq!(signed_volume(&mesh), 8.0, max_relative = 1e-4);
    }

    #[test]
    fn test_edge_midpoint_gets_its_own_wall_quad() {
        let square = profile(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let mesh = extrude(&square, 5.0).unwrap();

        assert_eq!(wall_count(&mesh), 2 * 5);
        assert_eq!(mesh.len(), 14);
        assert_relative_eq!(cap_area(&mesh, 5.0), 100.0, max_relative = 1e-4);
        assert_relative_eq!(cap_area(&mesh, 0.0), 100.0, max_relative = 1e-4);
        assert_relative_eq!(signed_volume(&mesh), 500.0, max_relative = 1e-4);
        assert!(mesh.validate().unwrap().degenerate.is_empty());
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let tri = profile(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        assert!(matches!(extrude(&tri, 0.0), Err(Error::InvalidDepth { .. })));
        assert!(matches!(extrude(&tri, f32::NAN), Err(Error::InvalidDepth { .. })));
    }

    #[test]
    fn test_flat_profile_is_degenerate() {
        let line = profile(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(matches!(extrude(&line, 1.0), Err(Error::DegenerateProfile { .. })));
    }

    #[test]
    fn test_bow_tie_is_degenerate() {
        let bow_tie = profile(&[(0.0, 0.0), (4.0, 4.0), (4.0, 0.0), (0.0, 4.0)]);
        assert!(matches!(extrude(&bow_tie, 1.0), Err(Error::DegenerateProfile { .. })));
    }

    fn regular_polygon(n: usize, radius: f64) -> Profile {
        let coords: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                (radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        profile(&coords)
    }

    proptest! {
        #[test]
        fn prism_has_expected_topology(
            n in 3usize..24,
            radius in 1.0f64..500.0,
            depth in prop_oneof![0.5f32..100.0, -100.0f32..-0.5],
        ) {
            let mesh = extrude(&regular_polygon(n, radius), depth).unwrap();

            prop_assert_eq!(mesh.len(), 2 * n + 2 * (n - 2));
            prop_assert!(mesh.triangles.iter().all(|t| !t.is_degenerate()));

            let center = mesh.bounds().unwrap().center();
            for t in &mesh.triangles {
                let centroid = Point3::from(
                    (t.vertices[0].coords + t.vertices[1].coords + t.vertices[2].coords) / 3.0,
                );
                prop_assert!(t.normal.dot(&(centroid - center)) > 0.0);
            }
        }
    }
}
