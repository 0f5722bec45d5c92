use crate::{
    common::{Transform, Vec2, Vec2Ext},
    settings::{MAX_MANIFOLD_POINTS, MAX_POLYGON_VERTICES},
    shape::{CircleShape, EdgeShape, PolygonShape},
};

use super::{
    clip_segment_to_line,
    collide_polygon::{ABSOLUTE_TOLERANCE, RELATIVE_TOLERANCE},
    ClipVertex, ContactFeature, ContactFeatureType, ContactId, Manifold, ManifoldType,
};

/// Max cross product between the contact normal and a neighbouring edge
/// normal before the contact is handed to that neighbour.
const SIN_TOLERANCE: f32 = 0.1;

/// Compute contact points for edge versus circle.
/// This accounts for edge connectivity.
pub fn collide_edge_and_circle(
    edge_a: &EdgeShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Compute circle in frame of edge
    let q = xf_a.mul_t_vec2(xf_b.mul_vec2(circle_b.p));

    let a = edge_a.vertex1;
    let b = edge_a.vertex2;
    let e = b - a;

    // Normal points to the right for a CCW winding
    let mut n = Vec2::new(e.y, -e.x);
    let offset = n.dot(q - a);

    if edge_a.one_sided && offset < 0.0 {
        return manifold;
    }

    // Barycentric coordinates
    let u = e.dot(b - q);
    let v = e.dot(q - a);

    let radius = edge_a.radius + circle_b.radius;

    let vertex_hit = |manifold: &mut Manifold, p: Vec2, index_a: u8| {
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::Circles;
        manifold.local_normal = Vec2::ZERO;
        manifold.local_point = p;
        manifold.points[0].id = ContactId {
            cf: ContactFeature {
                index_a,
                index_b: 0,
                type_a: ContactFeatureType::Vertex,
                type_b: ContactFeatureType::Vertex,
            },
        };
        manifold.points[0].local_point = circle_b.p;
    };

    // Region A
    if v <= 0.0 {
        let p = a;
        if q.distance_squared(p) > radius * radius {
            return manifold;
        }

        // Is there an edge connected to A?
        if edge_a.one_sided {
            let a1 = edge_a.vertex0;
            let b1 = a;
            let e1 = b1 - a1;
            let u1 = e1.dot(b1 - q);

            // Is the circle in Region AB of the previous edge?
            if u1 > 0.0 {
                return manifold;
            }
        }

        vertex_hit(&mut manifold, p, 0);
        return manifold;
    }

    // Region B
    if u <= 0.0 {
        let p = b;
        if q.distance_squared(p) > radius * radius {
            return manifold;
        }

        // Is there an edge connected to B?
        if edge_a.one_sided {
            let b2 = edge_a.vertex3;
            let a2 = b;
            let e2 = b2 - a2;
            let v2 = e2.dot(q - a2);

            // Is the circle in Region AB of the next edge?
            if v2 > 0.0 {
                return manifold;
            }
        }

        vertex_hit(&mut manifold, p, 1);
        return manifold;
    }

    // Region AB
    let den = e.length_squared();
    debug_assert!(den > 0.0);
    let p = (1.0 / den) * (u * a + v * b);
    if q.distance_squared(p) > radius * radius {
        return manifold;
    }

    if offset < 0.0 {
        n = -n;
    }
    n = n.normalize();

    manifold.point_count = 1;
    manifold.manifold_type = ManifoldType::FaceA;
    manifold.local_normal = n;
    manifold.local_point = a;
    manifold.points[0].id = ContactId {
        cf: ContactFeature {
            index_a: 0,
            index_b: 0,
            type_a: ContactFeatureType::Face,
            type_b: ContactFeatureType::Vertex,
        },
    };
    manifold.points[0].local_point = circle_b.p;
    manifold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisType {
    Unknown,
    EdgeA,
    EdgeB,
}

/// This structure is used to keep track of the best separating axis.
#[derive(Debug, Clone, Copy)]
struct EpAxis {
    normal: Vec2,
    axis_type: AxisType,
    index: usize,
    separation: f32,
}

/// This holds polygon B expressed in frame A.
struct TempPolygon {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    normals: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
}

impl TempPolygon {
    fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }
}

/// Reference face used for clipping
struct ReferenceFace {
    i1: usize,
    i2: usize,
    v1: Vec2,
    normal: Vec2,
    side_normal1: Vec2,
    side_offset1: f32,
    side_normal2: Vec2,
    side_offset2: f32,
}

fn compute_edge_separation(polygon_b: &TempPolygon, v1: Vec2, normal1: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        normal: Vec2::ZERO,
        axis_type: AxisType::EdgeA,
        index: 0,
        separation: -f32::MAX,
    };

    // Find axis with least overlap (min-max problem)
    for (j, axis_normal) in [normal1, -normal1].into_iter().enumerate() {
        // Find deepest polygon vertex along axis j
        let sj = polygon_b
            .vertices()
            .iter()
            .map(|v| axis_normal.dot(*v - v1))
            .fold(f32::MAX, f32::min);

        if sj > axis.separation {
            axis.index = j;
            axis.separation = sj;
            axis.normal = axis_normal;
        }
    }

    axis
}

fn compute_polygon_separation(polygon_b: &TempPolygon, v1: Vec2, v2: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        normal: Vec2::ZERO,
        axis_type: AxisType::Unknown,
        index: 0,
        separation: -f32::MAX,
    };

    for (i, (v, n)) in polygon_b.vertices().iter().zip(polygon_b.normals()).enumerate() {
        let n = -*n;

        let s1 = n.dot(*v - v1);
        let s2 = n.dot(*v - v2);
        let s = s1.min(s2);

        if s > axis.separation {
            axis.axis_type = AxisType::EdgeB;
            axis.index = i;
            axis.separation = s;
            axis.normal = n;
        }
    }

    axis
}

/// Compute the collision manifold between an edge and a polygon.
/// One-sided edges use their ghost vertices to suppress contacts that a
/// neighbouring edge is better placed to handle.
pub fn collide_edge_and_polygon(
    edge_a: &EdgeShape,
    xf_a: &Transform,
    polygon_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let xf = xf_a.mul_t(*xf_b);

    let centroid_b = xf.mul_vec2(polygon_b.centroid);

    let v1 = edge_a.vertex1;
    let v2 = edge_a.vertex2;

    let edge1 = (v2 - v1).normalize();

    // Normal points to the right for a CCW winding
    let normal1 = edge1.cross_scalar(1.0);
    let offset1 = normal1.dot(centroid_b - v1);

    if edge_a.one_sided && offset1 < 0.0 {
        return manifold;
    }

    // Get polygonB in frameA
    let mut temp_polygon_b = TempPolygon {
        vertices: [Vec2::ZERO; MAX_POLYGON_VERTICES],
        normals: [Vec2::ZERO; MAX_POLYGON_VERTICES],
        count: polygon_b.count(),
    };
    for (i, (v, n)) in polygon_b.vertices().iter().zip(polygon_b.normals()).enumerate() {
        temp_polygon_b.vertices[i] = xf.mul_vec2(*v);
        temp_polygon_b.normals[i] = xf.q * *n;
    }

    let radius = polygon_b.radius + edge_a.radius;

    let edge_axis = compute_edge_separation(&temp_polygon_b, v1, normal1);
    if edge_axis.separation > radius {
        return manifold;
    }

    let polygon_axis = compute_polygon_separation(&temp_polygon_b, v1, v2);
    if polygon_axis.separation > radius {
        return manifold;
    }

    // Use hysteresis for jitter reduction.
    let mut primary_axis = if polygon_axis.separation - radius
        > RELATIVE_TOLERANCE * (edge_axis.separation - radius) + ABSOLUTE_TOLERANCE
    {
        polygon_axis
    } else {
        edge_axis
    };

    if edge_a.one_sided {
        // Smooth collision
        // See https://box2d.org/posts/2020/06/ghost-collisions/

        let edge0 = (v1 - edge_a.vertex0).normalize();
        let normal0 = edge0.cross_scalar(1.0);
        let convex1 = edge0.cross(edge1) >= 0.0;

        let edge2 = (edge_a.vertex3 - v2).normalize();
        let normal2 = edge2.cross_scalar(1.0);
        let convex2 = edge1.cross(edge2) >= 0.0;

        let side1 = primary_axis.normal.dot(edge1) <= 0.0;

        // Check Gauss Map
        if side1 {
            if convex1 {
                if primary_axis.normal.cross(normal0) > SIN_TOLERANCE {
                    // Skip region
                    return manifold;
                }

                // Admit region
            } else {
                // Snap region
                primary_axis = edge_axis;
            }
        } else if convex2 {
            if normal2.cross(primary_axis.normal) > SIN_TOLERANCE {
                // Skip region
                return manifold;
            }

            // Admit region
        } else {
            // Snap region
            primary_axis = edge_axis;
        }
    }

    let clip_vertex = |v: Vec2, index_a: usize, index_b: usize, type_a, type_b| ClipVertex {
        v,
        id: ContactId {
            cf: ContactFeature {
                index_a: index_a as u8,
                index_b: index_b as u8,
                type_a,
                type_b,
            },
        },
    };

    let (clip_points, reference) = if primary_axis.axis_type == AxisType::EdgeA {
        manifold.manifold_type = ManifoldType::FaceA;

        // Search for the polygon normal that is most anti-parallel to the edge normal.
        let mut best_index = 0;
        let mut best_value = primary_axis.normal.dot(temp_polygon_b.normals[0]);
        for (i, n) in temp_polygon_b.normals().iter().enumerate().skip(1) {
            let value = primary_axis.normal.dot(*n);
            if value < best_value {
                best_value = value;
                best_index = i;
            }
        }

        let i1 = best_index;
        let i2 = if i1 + 1 < temp_polygon_b.count { i1 + 1 } else { 0 };

        let clip_points = [
            clip_vertex(
                temp_polygon_b.vertices[i1],
                0,
                i1,
                ContactFeatureType::Face,
                ContactFeatureType::Vertex,
            ),
            clip_vertex(
                temp_polygon_b.vertices[i2],
                0,
                i2,
                ContactFeatureType::Face,
                ContactFeatureType::Vertex,
            ),
        ];

        let reference = ReferenceFace {
            i1: 0,
            i2: 1,
            v1,
            normal: primary_axis.normal,
            side_normal1: -edge1,
            side_offset1: -edge1.dot(v1),
            side_normal2: edge1,
            side_offset2: edge1.dot(v2),
        };

        (clip_points, reference)
    } else {
        manifold.manifold_type = ManifoldType::FaceB;

        let index = primary_axis.index;
        let clip_points = [
            clip_vertex(v2, 1, index, ContactFeatureType::Vertex, ContactFeatureType::Face),
            clip_vertex(v1, 0, index, ContactFeatureType::Vertex, ContactFeatureType::Face),
        ];

        let i1 = index;
        let i2 = if i1 + 1 < temp_polygon_b.count { i1 + 1 } else { 0 };
        let ref_v1 = temp_polygon_b.vertices[i1];
        let ref_v2 = temp_polygon_b.vertices[i2];
        let normal = temp_polygon_b.normals[i1];

        // CCW winding
        let side_normal1 = normal.cross_scalar(1.0);
        let side_normal2 = -side_normal1;

        let reference = ReferenceFace {
            i1,
            i2,
            v1: ref_v1,
            normal,
            side_normal1,
            side_offset1: side_normal1.dot(ref_v1),
            side_normal2,
            side_offset2: side_normal2.dot(ref_v2),
        };

        (clip_points, reference)
    };

    // Clip incident edge against reference face side planes
    let mut clip_points1 = [ClipVertex::default(); 2];
    let mut clip_points2 = [ClipVertex::default(); 2];

    // Clip to side 1
    let np = clip_segment_to_line(
        &mut clip_points1,
        &clip_points,
        reference.side_normal1,
        reference.side_offset1,
        reference.i1,
    );
    if np < MAX_MANIFOLD_POINTS {
        return manifold;
    }

    // Clip to side 2
    let np = clip_segment_to_line(
        &mut clip_points2,
        &clip_points1,
        reference.side_normal2,
        reference.side_offset2,
        reference.i2,
    );
    if np < MAX_MANIFOLD_POINTS {
        return manifold;
    }

    // Now clip_points2 contains the clipped points.
    if primary_axis.axis_type == AxisType::EdgeA {
        manifold.local_normal = reference.normal;
        manifold.local_point = reference.v1;
    } else {
        manifold.local_normal = polygon_b.normals()[reference.i1];
        manifold.local_point = polygon_b.vertices()[reference.i1];
    }

    let mut point_count = 0;
    for clip_point in &clip_points2 {
        let separation = reference.normal.dot(clip_point.v - reference.v1);

        if separation <= radius {
            let cp = &mut manifold.points[point_count];

            if primary_axis.axis_type == AxisType::EdgeA {
                cp.local_point = xf.mul_t_vec2(clip_point.v);
                cp.id = clip_point.id;
            } else {
                cp.local_point = clip_point.v;
                cp.id.cf = clip_point.id.cf.swapped();
            }

            point_count += 1;
        }
    }

    manifold.point_count = point_count;
    manifold
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::collision::WorldManifold;

    fn ground() -> EdgeShape {
        EdgeShape::new_two_sided(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0))
    }

    #[test]
    fn circle_resting_on_edge_face() {
        let edge = ground();
        let circle = CircleShape::new(Vec2::ZERO, 0.5);
        let xf_b = Transform::new(Vec2::new(1.0, 0.45), 0.0);

        let manifold = collide_edge_and_circle(&edge, &Transform::IDENTITY, &circle, &xf_b);
        assert_eq!(manifold.point_count, 1);
        assert_eq!(manifold.manifold_type, ManifoldType::FaceA);
        assert_relative_eq!(manifold.local_normal.y, 1.0, epsilon = 1e-6);

        let xf_a = Transform::IDENTITY;
        let world = WorldManifold::new(&manifold, &xf_a, edge.radius, &xf_b, circle.radius);
        assert_relative_eq!(world.separations[0], -0.05 - edge.radius, epsilon = 1e-5);
    }

    #[test]
    fn two_sided_edge_flips_normal_below() {
        let edge = ground();
        let circle = CircleShape::new(Vec2::ZERO, 0.5);
        let xf_b = Transform::new(Vec2::new(0.0, -0.4), 0.0);

        let manifold = collide_edge_and_circle(&edge, &Transform::IDENTITY, &circle, &xf_b);
        assert_eq!(manifold.point_count, 1);
        assert_relative_eq!(manifold.local_normal.y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn one_sided_edge_ignores_back_side() {
        // Normal points to the right of v1 -> v2, so +y for this winding.
        let edge = EdgeShape::new_one_sided(
            Vec2::new(6.0, 0.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(-5.0, 0.0),
            Vec2::new(-6.0, 0.0),
        );
        let circle = CircleShape::new(Vec2::ZERO, 0.5);

        let above = Transform::new(Vec2::new(0.0, 0.4), 0.0);
        let xf_a = Transform::IDENTITY;
        assert_eq!(collide_edge_and_circle(&edge, &xf_a, &circle, &above).point_count, 1);

        let below = Transform::new(Vec2::new(0.0, -0.4), 0.0);
        assert_eq!(collide_edge_and_circle(&edge, &xf_a, &circle, &below).point_count, 0);
    }

    #[test]
    fn circle_at_edge_vertex() {
        let edge = ground();
        let circle = CircleShape::new(Vec2::ZERO, 0.5);
        let xf_b = Transform::new(Vec2::new(5.3, 0.1), 0.0);

        let manifold = collide_edge_and_circle(&edge, &Transform::IDENTITY, &circle, &xf_b);
        assert_eq!(manifold.point_count, 1);
        assert_eq!(manifold.manifold_type, ManifoldType::Circles);
        assert_eq!(manifold.local_point, Vec2::new(5.0, 0.0));
        assert_eq!(manifold.points[0].id.cf.index_a, 1);
    }

    #[test]
    fn box_resting_on_edge() {
        let edge = ground();
        let square = PolygonShape::new_box(0.5, 0.5);
        let xf_b = Transform::new(Vec2::new(0.0, 0.49), 0.0);

        let manifold = collide_edge_and_polygon(&edge, &Transform::IDENTITY, &square, &xf_b);
        assert_eq!(manifold.point_count, 2);
        assert_eq!(manifold.manifold_type, ManifoldType::FaceA);

        let xf_a = Transform::IDENTITY;
        let world = WorldManifold::new(&manifold, &xf_a, edge.radius, &xf_b, square.radius);
        assert_relative_eq!(world.normal.y, 1.0, epsilon = 1e-5);
        for separation in &world.separations {
            assert_relative_eq!(*separation, -0.01 - edge.radius - square.radius, epsilon = 1e-5);
        }
    }

    #[test]
    fn box_far_from_edge() {
        let edge = ground();
        let square = PolygonShape::new_box(0.5, 0.5);
        let xf_b = Transform::new(Vec2::new(0.0, 3.0), 0.3);
        let manifold = collide_edge_and_polygon(&edge, &Transform::IDENTITY, &square, &xf_b);
        assert_eq!(manifold.point_count, 0);
    }

    #[test]
    fn one_sided_edge_ignores_polygon_behind() {
        let edge = EdgeShape::new_one_sided(
            Vec2::new(6.0, 0.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(-5.0, 0.0),
            Vec2::new(-6.0, 0.0),
        );
        let square = PolygonShape::new_box(0.5, 0.5);
        let xf_b = Transform::new(Vec2::new(0.0, -0.45), 0.0);
        let manifold = collide_edge_and_polygon(&edge, &Transform::IDENTITY, &square, &xf_b);
        assert_eq!(manifold.point_count, 0);
    }

    #[test]
    fn flat_chain_junction_has_no_ghost_normal() {
        // Box sliding across the junction between two collinear one-sided
        // edges must only ever see an upward normal.
        let left = EdgeShape::new_one_sided(
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(-1.0, 0.0),
        );
        let square = PolygonShape::new_box(0.5, 0.5);
        let xf_b = Transform::new(Vec2::new(-0.45, 0.49), 0.0);

        let manifold = collide_edge_and_polygon(&left, &Transform::IDENTITY, &square, &xf_b);
        assert!(manifold.point_count > 0);
        let xf_a = Transform::IDENTITY;
        let world = WorldManifold::new(&manifold, &xf_a, left.radius, &xf_b, square.radius);
        assert_relative_eq!(world.normal.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(world.normal.y, 1.0, epsilon = 1e-5);
    }
}
