// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Ear-clipping triangulation of planar polygons with holes

use nalgebra::Point2;

fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Twice the signed area of a closed ring, positive for counter-clockwise
pub fn signed_area2(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Even-odd point in polygon test
pub fn point_in_ring(p: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Proper crossing of segments `ab` and `cd` (shared endpoints do not count)
fn segments_cross(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>, eps: f64) -> bool {
    let d1 = orient2d(c, d, a);
    let d2 = orient2d(c, d, b);
    let d3 = orient2d(a, b, c);
    let d4 = orient2d(a, b, d);
    ((d1 > eps && d2 < -eps) || (d1 < -eps && d2 > eps))
        && ((d3 > eps && d4 < -eps) || (d3 < -eps && d4 > eps))
}

/// Triangulate a polygon given as an outer ring plus hole rings.
///
/// Vertex indices in the result address the concatenation of `outer` and
/// every hole in order. Triangles are counter-clockwise regardless of the
/// input ring orientation.
pub fn triangulate_polygon(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Vec<[usize; 3]> {
    if outer.len() < 3 {
        return Vec::new();
    }

    let mut points: Vec<Point2<f64>> = outer.to_vec();
    for hole in holes {
        points.extend_from_slice(hole);
    }

    let (mut lo, mut hi) = (points[0], points[0]);
    for p in &points {
        lo = lo.inf(p);
        hi = hi.sup(p);
    }
    let extent = (hi - lo).norm();
    let eps = 1e-12 * extent * extent;

    // Outer ring counter-clockwise
    let mut ring: Vec<usize> = (0..outer.len()).collect();
    if signed_area2(outer) < 0.0 {
        ring.reverse();
    }

    // Hole rings clockwise, rightmost hole bridged first
    let mut offset = outer.len();
    let mut hole_rings: Vec<Vec<usize>> = Vec::with_capacity(holes.len());
    for hole in holes {
        if hole.len() >= 3 {
            let mut indices: Vec<usize> = (offset..offset + hole.len()).collect();
            if signed_area2(hole) > 0.0 {
                indices.reverse();
            }
            hole_rings.push(indices);
        }
        offset += hole.len();
    }
    let max_x = |r: &Vec<usize>| r.iter().map(|&i| points[i].x).fold(f64::NEG_INFINITY, f64::max);
    hole_rings.sort_by(|a, b| max_x(b).total_cmp(&max_x(a)));

    for (k, hole) in hole_rings.iter().enumerate() {
        let pending = &hole_rings[k + 1..];
        if !bridge_hole(&mut ring, hole, pending, &points, eps) {
            log::debug!("hole of {} vertices could not be bridged, dropped", hole.len());
        }
    }

    clip_ears(ring, &points, eps)
}

/// Splice `hole` into `ring` through the shortest bridge that crosses no edge
fn bridge_hole(
    ring: &mut Vec<usize>,
    hole: &[usize],
    pending: &[Vec<usize>],
    points: &[Point2<f64>],
    eps: f64,
) -> bool {
    let (h_pos, &h) = match hole
        .iter()
        .enumerate()
        .max_by(|a, b| points[*a.1].x.total_cmp(&points[*b.1].x))
    {
        Some(found) => found,
        None => return false,
    };
    let hp = points[h];

    let mut candidates: Vec<usize> = (0..ring.len()).collect();
    candidates.sort_by(|&a, &b| {
        let da = (points[ring[a]] - hp).norm_squared();
        let db = (points[ring[b]] - hp).norm_squared();
        da.total_cmp(&db).then(a.cmp(&b))
    });

    let ring_edges = |r: &[usize]| {
        (0..r.len())
            .map(|i| (r[i], r[(i + 1) % r.len()]))
            .collect::<Vec<_>>()
    };
    let mut blockers = ring_edges(ring);
    blockers.extend(ring_edges(hole));
    for other in pending {
        blockers.extend(ring_edges(other));
    }

    for pos in candidates {
        let p = ring[pos];
        let pp = points[p];
        let blocked = blockers.iter().any(|&(a, b)| {
            a != p && b != p && a != h && b != h && segments_cross(&hp, &pp, &points[a], &points[b], eps)
        });
        if blocked {
            continue;
        }

        let mut spliced = Vec::with_capacity(ring.len() + hole.len() + 2);
        spliced.extend_from_slice(&ring[..=pos]);
        spliced.extend(hole[h_pos..].iter().chain(&hole[..h_pos]));
        spliced.push(h);
        spliced.push(p);
        spliced.extend_from_slice(&ring[pos + 1..]);
        *ring = spliced;
        return true;
    }

    false
}

fn clip_ears(mut ring: Vec<usize>, points: &[Point2<f64>], eps: f64) -> Vec<[usize; 3]> {
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
    let mut i = 0;
    let mut misses = 0;

    while ring.len() > 3 {
        let n = ring.len();
        let (ia, ib, ic) = ((i + n - 1) % n, i % n, (i + 1) % n);
        let (a, b, c) = (ring[ia], ring[ib], ring[ic]);
        let turn = orient2d(&points[a], &points[b], &points[c]);

        if turn.abs() <= eps {
            // Collinear or doubled-back vertex contributes no area
            ring.remove(ib);
            misses = 0;
            continue;
        }

        if turn > 0.0 && is_ear(&ring, a, b, c, points, eps) {
            triangles.push([a, b, c]);
            ring.remove(ib);
            misses = 0;
            continue;
        }

        i = (i + 1) % n;
        misses += 1;
        if misses > n {
            // No clean ear left (self-touching input); clip the most convex corner
            let best = (0..n)
                .max_by(|&x, &y| {
                    let tx = orient2d(&points[ring[(x + n - 1) % n]], &points[ring[x]], &points[ring[(x + 1) % n]]);
                    let ty = orient2d(&points[ring[(y + n - 1) % n]], &points[ring[y]], &points[ring[(y + 1) % n]]);
                    tx.total_cmp(&ty)
                })
                .unwrap_or(0);
            let tri = [ring[(best + n - 1) % n], ring[best], ring[(best + 1) % n]];
            if orient2d(&points[tri[0]], &points[tri[1]], &points[tri[2]]) > eps {
                triangles.push(tri);
            }
            ring.remove(best);
            misses = 0;
        }
    }

    if ring.len() == 3 && orient2d(&points[ring[0]], &points[ring[1]], &points[ring[2]]) > eps {
        triangles.push([ring[0], ring[1], ring[2]]);
    }

    triangles
}

fn is_ear(ring: &[usize], a: usize, b: usize, c: usize, points: &[Point2<f64>], eps: f64) -> bool {
    let (pa, pb, pc) = (points[a], points[b], points[c]);
    ring.iter().all(|&p| {
        if p == a || p == b || p == c {
            return true;
        }
        let pt = points[p];
        if pt == pa || pt == pb || pt == pc {
            return true;
        }
        let inside = orient2d(&pa, &pb, &pt) >= -eps
            && orient2d(&pb, &pc, &pt) >= -eps
            && orient2d(&pc, &pa, &pt) >= -eps;
        !inside
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn area(points: &[Point2<f64>], triangles: &[[usize; 3]]) -> f64 {
        triangles
            .iter()
            .map(|t| orient2d(&points[t[0]], &points[t[1]], &points[t[2]]) * 0.5)
            .sum()
    }

    fn square(half: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(-half, -half),
            Point2::new(half, -half),
            Point2::new(half, half),
            Point2::new(-half, half),
        ]
    }

    #[test]
    fn test_square_two_triangles() {
        let outer = square(1.0);
        let tris = triangulate_polygon(&outer, &[]);
        assert_eq!(tris.len(), 2);
        assert_relative_eq!(area(&outer, &tris), 4.0);
    }

    #[test]
    fn test_clockwise_input_gives_ccw_triangles() {
        let mut outer = square(1.0);
        outer.reverse();
        let tris = triangulate_polygon(&outer, &[]);
        for t in &tris {
            assert!(orient2d(&outer[t[0]], &outer[t[1]], &outer[t[2]]) > 0.0);
        }
    }

    #[test]
    fn test_concave_polygon_area() {
        // L-shape, area 3
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let tris = triangulate_polygon(&outer, &[]);
        assert_eq!(tris.len(), 4);
        assert_relative_eq!(area(&outer, &tris), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_square_with_hole() {
        let outer = square(2.0);
        let hole = square(1.0);
        let tris = triangulate_polygon(&outer, &[hole.clone()]);

        let mut all = outer.clone();
        all.extend_from_slice(&hole);
        assert_relative_eq!(area(&all, &tris), 16.0 - 4.0, epsilon = 1e-9);
        // No triangle centroid inside the hole
        for t in &tris {
            let c = Point2::from((all[t[0]].coords + all[t[1]].coords + all[t[2]].coords) / 3.0);
            assert!(!point_in_ring(&c, &hole));
        }
    }

    #[test]
    fn test_point_in_ring() {
        let ring = square(1.0);
        assert!(point_in_ring(&Point2::new(0.0, 0.0), &ring));
        assert!(!point_in_ring(&Point2::new(2.0, 0.0), &ring));
    }
}
