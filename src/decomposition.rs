//! Convex decomposition of simple polygons.
//!
//! Mark Bayazit's algorithm, see <http://mnbayazit.com/406/bayazit>.
//! Splits a simple counter-clockwise polygon at its reflex vertices until
//! every piece is convex and small enough to become a [`PolygonShape`].
//!
//! [`PolygonShape`]: crate::shape::PolygonShape

use thiserror::Error;

use crate::{common::Vec2, settings::Settings};

/// Why a polygon could not be partitioned.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PartitionError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon vertices must be in counter-clockwise order")]
    NotCounterClockwise,
    #[error("polygon edges intersect each other")]
    NotSimple,
    #[error("polygon produced a degenerate split piece with {0} vertices")]
    DegenerateSplit(usize),
}

/// Vertex `i` of a closed polygon, wrapping in both directions.
#[inline]
fn at(vertices: &[Vec2], i: isize) -> Vec2 {
    vertices[i.rem_euclid(vertices.len() as isize) as usize]
}

/// Vertices `i..=j` going forward around the polygon.
fn copy(vertices: &[Vec2], i: isize, mut j: isize) -> Vec<Vec2> {
    let n = vertices.len() as isize;
    while j < i {
        j += n;
    }
    (i..=j).map(|k| at(vertices, k)).collect()
}

/// Twice the signed area of the triangle `a`, `b`, `c`. Positive when the
/// triangle turns left.
#[inline]
pub fn area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y)
}

#[inline]
fn left(a: Vec2, b: Vec2, c: Vec2) -> bool {
    area(a, b, c) > 0.0
}

#[inline]
fn left_on(a: Vec2, b: Vec2, c: Vec2) -> bool {
    area(a, b, c) >= 0.0
}

#[inline]
fn right(a: Vec2, b: Vec2, c: Vec2) -> bool {
    area(a, b, c) < 0.0
}

#[inline]
fn right_on(a: Vec2, b: Vec2, c: Vec2) -> bool {
    area(a, b, c) <= 0.0
}

fn reflex(vertices: &[Vec2], i: isize) -> bool {
    right(at(vertices, i - 1), at(vertices, i), at(vertices, i + 1))
}

/// Intersection of the infinite lines through `p1 p2` and `q1 q2`. Parallel
/// or degenerate lines have no intersection.
pub fn line_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> Option<Vec2> {
    let a1 = p2.y - p1.y;
    let b1 = p1.x - p2.x;
    let c1 = a1 * p1.x + b1 * p1.y;
    let a2 = q2.y - q1.y;
    let b2 = q1.x - q2.x;
    let c2 = a2 * q1.x + b2 * q1.y;
    let det = a1 * b2 - a2 * b1;

    if det.abs() <= f32::EPSILON {
        return None;
    }

    Some(Vec2::new((b2 * c1 - b1 * c2) / det, (a1 * c2 - a2 * c1) / det))
}

/// Intersection of the segments `p1 p2` and `p3 p4`, endpoints included.
/// Segments that only share their first points are not reported.
pub fn segment_intersect(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<Vec2> {
    let a = p4.y - p3.y;
    let b = p2.x - p1.x;
    let c = p4.x - p3.x;
    let d = p2.y - p1.y;

    // Parallel or degenerate segments.
    let denom = a * b - c * d;
    if denom.abs() <= f32::EPSILON {
        return None;
    }

    let e = p1.y - p3.y;
    let f = p1.x - p3.x;
    let inv_denom = 1.0 / denom;

    let ua = (c * e - a * f) * inv_denom;
    if !(0.0..=1.0).contains(&ua) {
        return None;
    }

    let ub = (b * e - d * f) * inv_denom;
    if !(0.0..=1.0).contains(&ub) {
        return None;
    }

    if ua == 0.0 && ub == 0.0 {
        return None;
    }

    Some(p1 + ua * (p2 - p1))
}

/// Can vertex `i` see vertex `j` through the interior of the polygon?
fn can_see(vertices: &[Vec2], i: isize, j: isize) -> bool {
    let (vi, vj) = (at(vertices, i), at(vertices, j));

    if reflex(vertices, i) {
        if left_on(vi, at(vertices, i - 1), vj) && right_on(vi, at(vertices, i + 1), vj) {
            return false;
        }
    } else if right_on(vi, at(vertices, i + 1), vj) || left_on(vi, at(vertices, i - 1), vj) {
        return false;
    }

    if reflex(vertices, j) {
        if left_on(vj, at(vertices, j - 1), vi) && right_on(vj, at(vertices, j + 1), vi) {
            return false;
        }
    } else if right_on(vj, at(vertices, j + 1), vi) || left_on(vj, at(vertices, j - 1), vi) {
        return false;
    }

    let n = vertices.len() as isize;
    let (i, j) = (i.rem_euclid(n), j.rem_euclid(n));
    for k in 0..n {
        let k1 = (k + 1) % n;
        // ignore incident edges
        if k == i || k1 == i || k == j || k1 == j {
            continue;
        }
        if segment_intersect(vi, vj, at(vertices, k), at(vertices, k1)).is_some() {
            return false;
        }
    }

    true
}

/// Twice the signed area of the polygon. Positive for counter-clockwise
/// winding.
pub fn signed_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.x * b.y - a.y * b.x
        })
        .sum()
}

pub fn is_counter_clockwise(vertices: &[Vec2]) -> bool {
    vertices.len() >= 3 && signed_area(vertices) > 0.0
}

/// True when no vertex turns right. Collinear runs are allowed.
pub fn is_convex(vertices: &[Vec2]) -> bool {
    let n = vertices.len() as isize;
    n >= 3 && (0..n).all(|i| !reflex(vertices, i))
}

/// True when no two edges cross or touch other than at shared vertices, and
/// no two vertices coincide.
pub fn is_simple(vertices: &[Vec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        for j in i + 1..n {
            if vertices[i] == vertices[j] {
                return false;
            }
        }
    }

    for i in 0..n {
        let (a1, a2) = (vertices[i], vertices[(i + 1) % n]);
        for j in i + 1..n {
            // Adjacent edges share a vertex.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (vertices[j], vertices[(j + 1) % n]);
            if segment_intersect(a1, a2, b1, b2).is_some() {
                return false;
            }
        }
    }

    true
}

/// Remove vertices that lie on the line through their neighbours, within
/// `tolerance` of twice the triangle area. The polygon is returned untouched
/// when simplification would leave fewer than 3 vertices.
pub fn collinear_simplify(vertices: &[Vec2], tolerance: f32) -> Vec<Vec2> {
    if vertices.len() <= 3 {
        return vertices.to_vec();
    }

    let simplified: Vec<Vec2> = (0..vertices.len() as isize)
        .filter(|&i| {
            area(at(vertices, i - 1), at(vertices, i), at(vertices, i + 1)).abs() > tolerance
        })
        .map(|i| at(vertices, i))
        .collect();

    if simplified.len() < 3 {
        return vertices.to_vec();
    }

    simplified
}

fn validate(vertices: &[Vec2]) -> Result<(), PartitionError> {
    if vertices.len() < 3 {
        return Err(PartitionError::TooFewVertices(vertices.len()));
    }
    if !is_simple(vertices) {
        return Err(PartitionError::NotSimple);
    }
    if !is_counter_clockwise(vertices) {
        return Err(PartitionError::NotCounterClockwise);
    }
    Ok(())
}

/// Split at the first reflex vertex, or bisect a convex polygon that has too
/// many vertices. Returns `None` when the polygon is a finished piece.
fn split(
    vertices: &[Vec2],
    max_vertices: usize,
) -> Result<Option<(Vec<Vec2>, Vec<Vec2>)>, PartitionError> {
    let n = vertices.len() as isize;

    let Some(i) = (0..n).find(|&i| reflex(vertices, i)) else {
        if vertices.len() > max_vertices {
            let half = n / 2;
            return Ok(Some((copy(vertices, 0, half), copy(vertices, half, 0))));
        }
        return Ok(None);
    };

    let (prev, vi, next) = (at(vertices, i - 1), at(vertices, i), at(vertices, i + 1));

    let mut lower_dist = f32::MAX;
    let mut upper_dist = f32::MAX;
    let mut lower_int = Vec2::ZERO;
    let mut upper_int = Vec2::ZERO;
    let mut lower_index = None;
    let mut upper_index = None;

    for j in 0..n {
        let (vj_prev, vj, vj_next) = (at(vertices, j - 1), at(vertices, j), at(vertices, j + 1));

        // if line intersects with an edge
        if left(prev, vi, vj) && right_on(prev, vi, vj_prev) {
            // find the point of intersection
            if let Some(p) = line_intersect(prev, vi, vj, vj_prev) {
                // make sure it's inside the poly
                if right(next, vi, p) {
                    let d = vi.distance_squared(p);
                    if d < lower_dist {
                        // keep only the closest intersection
                        lower_dist = d;
                        lower_int = p;
                        lower_index = Some(j);
                    }
                }
            }
        }

        if left(next, vi, vj_next) && right_on(next, vi, vj) {
            if let Some(p) = line_intersect(next, vi, vj, vj_next) {
                if left(prev, vi, p) {
                    let d = vi.distance_squared(p);
                    if d < upper_dist {
                        upper_dist = d;
                        upper_int = p;
                        upper_index = Some(j);
                    }
                }
            }
        }
    }

    let (Some(lower_index), Some(mut upper_index)) = (lower_index, upper_index) else {
        // Rays from a reflex vertex of a simple polygon always hit an edge.
        return Err(PartitionError::DegenerateSplit(vertices.len()));
    };

    // if there are no vertices to connect to, choose a point in the middle
    if lower_index == (upper_index + 1) % n {
        let steiner = 0.5 * (lower_int + upper_int);

        let mut lower_poly = copy(vertices, i, upper_index);
        lower_poly.push(steiner);
        let mut upper_poly = copy(vertices, lower_index, i);
        upper_poly.push(steiner);

        return Ok(Some((lower_poly, upper_poly)));
    }

    let mut highest_score = 0.0;
    let mut best_index = lower_index;
    while upper_index < lower_index {
        upper_index += n;
    }

    for j in lower_index..=upper_index {
        if !can_see(vertices, i, j) {
            continue;
        }

        let vj = at(vertices, j);
        let mut score = 1.0 / (vi.distance_squared(vj) + 1.0);
        if reflex(vertices, j) {
            if right_on(at(vertices, j - 1), vj, vi) && left_on(at(vertices, j + 1), vj, vi) {
                score += 3.0;
            } else {
                score += 2.0;
            }
        } else {
            score += 1.0;
        }

        if score > highest_score {
            best_index = j;
            highest_score = score;
        }
    }

    let best_index = best_index.rem_euclid(n);
    Ok(Some((copy(vertices, i, best_index), copy(vertices, best_index, i))))
}

/// Decompose a simple counter-clockwise polygon into convex pieces of at
/// most `settings.max_polygon_vertices` vertices. Collinear points are
/// removed from every piece.
pub fn convex_partition(
    vertices: &[Vec2],
    settings: &Settings,
) -> Result<Vec<Vec<Vec2>>, PartitionError> {
    if let Err(err) = validate(vertices) {
        log::debug!("rejecting polygon with {} vertices: {err}", vertices.len());
        return Err(err);
    }

    let max_vertices = settings.max_polygon_vertices.max(3);

    // Every split either removes a reflex vertex or bisects a convex piece.
    let mut split_budget = vertices.len() * vertices.len().max(max_vertices);

    let mut pieces = Vec::new();
    let mut pending = vec![vertices.to_vec()];

    while let Some(polygon) = pending.pop() {
        let Some((lower, upper)) = split(&polygon, max_vertices)? else {
            pieces.push(polygon);
            continue;
        };

        for piece in [&lower, &upper] {
            if piece.len() < 3 {
                return Err(PartitionError::DegenerateSplit(piece.len()));
            }
        }

        if split_budget == 0 {
            return Err(PartitionError::DegenerateSplit(polygon.len()));
        }
        split_budget -= 1;

        // The smaller piece is processed first.
        if lower.len() <= upper.len() {
            pending.push(upper);
            pending.push(lower);
        } else {
            pending.push(lower);
            pending.push(upper);
        }
    }

    // The polygons are not guaranteed to be without collinear points.
    Ok(pieces
        .iter()
        .map(|piece| collinear_simplify(piece, 0.0))
        .filter(|piece| !piece.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn total_area(pieces: &[Vec<Vec2>]) -> f32 {
        pieces.iter().map(|p| 0.5 * signed_area(p)).sum()
    }

    fn assert_valid_partition(input: &[Vec2], pieces: &[Vec<Vec2>], max_vertices: usize) {
        assert!(!pieces.is_empty());
        for piece in pieces {
            assert!(piece.len() >= 3, "piece {piece:?}");
            assert!(piece.len() <= max_vertices, "piece {piece:?}");
            assert!(is_convex(piece), "piece {piece:?}");
        }
        assert_relative_eq!(total_area(pieces), 0.5 * signed_area(input), epsilon = 1e-3);
    }

    fn l_shape() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ]
    }

    #[test]
    fn convex_input_is_returned_whole() {
        let square = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let pieces = convex_partition(&square, &Settings::default()).unwrap();
        assert_eq!(pieces, vec![square]);
    }

    #[test]
    fn l_shape_splits_in_two() {
        let input = l_shape();
        let pieces = convex_partition(&input, &Settings::default()).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_valid_partition(&input, &pieces, 8);
    }

    #[test]
    fn star_is_partitioned() {
        let input: Vec<Vec2> = (0..10)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 10.0;
                let r = if i % 2 == 0 { 2.0 } else { 0.8 };
                Vec2::new(r * angle.cos(), r * angle.sin())
            })
            .collect();
        let pieces = convex_partition(&input, &Settings::default()).unwrap();
        assert!(pieces.len() >= 2);
        assert_valid_partition(&input, &pieces, 8);
    }

    #[test]
    fn comb_is_partitioned() {
        // Three teeth pointing up from a base bar.
        let input = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(5.0, 3.0),
            Vec2::new(4.0, 3.0),
            Vec2::new(4.0, 1.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(2.0, 3.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 3.0),
            Vec2::new(0.0, 3.0),
        ];
        let pieces = convex_partition(&input, &Settings::default()).unwrap();
        assert!(pieces.len() >= 3);
        assert_valid_partition(&input, &pieces, 8);
    }

    #[test]
    fn large_convex_polygon_is_bisected() {
        let input: Vec<Vec2> = (0..12)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 12.0;
                Vec2::new(angle.cos(), angle.sin())
            })
            .collect();

        let settings = Settings {
            max_polygon_vertices: 5,
            ..Settings::default()
        };
        let pieces = convex_partition(&input, &settings).unwrap();
        assert!(pieces.len() >= 3);
        assert_valid_partition(&input, &pieces, 5);
    }

    #[test]
    fn collinear_points_are_removed() {
        let input = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let pieces = convex_partition(&input, &Settings::default()).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].len(), 4);
        assert!(!pieces[0].contains(&Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn invalid_input_is_rejected() {
        let settings = Settings::default();
        assert_eq!(
            convex_partition(&[Vec2::ZERO, Vec2::X], &settings),
            Err(PartitionError::TooFewVertices(2))
        );

        let mut clockwise = l_shape();
        clockwise.reverse();
        assert_eq!(
            convex_partition(&clockwise, &settings),
            Err(PartitionError::NotCounterClockwise)
        );

        let bowtie = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        assert_eq!(convex_partition(&bowtie, &settings), Err(PartitionError::NotSimple));

        let duplicate = [Vec2::ZERO, Vec2::X, Vec2::X, Vec2::Y];
        assert_eq!(convex_partition(&duplicate, &settings), Err(PartitionError::NotSimple));
    }

    #[test]
    fn intersections_handle_degenerate_lines() {
        assert!(line_intersect(Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::new(1.0, 1.0)).is_none());
        assert!(line_intersect(Vec2::ZERO, Vec2::ZERO, Vec2::Y, Vec2::X).is_none());
        assert_eq!(
            line_intersect(Vec2::ZERO, Vec2::X, Vec2::new(0.5, -1.0), Vec2::new(0.5, 1.0)),
            Some(Vec2::new(0.5, 0.0))
        );
        let far = segment_intersect(Vec2::ZERO, Vec2::X, Vec2::new(2.0, -1.0), Vec2::new(2.0, 1.0));
        assert!(far.is_none());
    }

    #[test]
    fn polygon_predicates() {
        let input = l_shape();
        assert_relative_eq!(signed_area(&input), 6.0);
        assert!(is_counter_clockwise(&input));
        assert!(!is_convex(&input));
        assert!(is_simple(&input));
    }
}
