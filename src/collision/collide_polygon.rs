use crate::{
    common::{Transform, Vec2Ext},
    settings::MAX_MANIFOLD_POINTS,
    shape::PolygonShape,
};

use super::{
    clip_segment_to_line, ClipVertex, ContactFeature, ContactFeatureType, ContactId, Manifold,
    ManifoldType,
};

/// Reference face hysteresis. Polygon B only becomes the reference when its
/// separation beats A's by this margin, which keeps the normal from
/// flickering between near-equal faces. These values are tuned against
/// contact persistence; do not change them without re-validating.
pub const RELATIVE_TOLERANCE: f32 = 0.98;
pub const ABSOLUTE_TOLERANCE: f32 = 0.001;

/// Find the max separation between poly1 and poly2 using edge normals from
/// poly1.
fn find_max_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> (usize, f32) {
    let n1s = poly1.normals();
    let v1s = poly1.vertices();
    let v2s = poly2.vertices();
    let xf = xf2.mul_t(*xf1);

    let mut best_index = 0;
    let mut max_separation = -f32::MAX;
    for (i, (n1, v1)) in n1s.iter().zip(v1s).enumerate() {
        // Get poly1 normal in frame2.
        let n = xf.q * *n1;
        let v1 = xf.mul_vec2(*v1);

        // Find deepest point for normal i.
        let si = v2s
            .iter()
            .map(|v2| n.dot(*v2 - v1))
            .fold(f32::MAX, f32::min);

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }

    (best_index, max_separation)
}

fn find_incident_edge(
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    let normals1 = poly1.normals();

    let count2 = poly2.count();
    let vertices2 = poly2.vertices();
    let normals2 = poly2.normals();

    debug_assert!(edge1 < poly1.count());

    // Get the normal of the reference edge in poly2's frame.
    let normal1 = xf2.q.mul_t_vec2(xf1.q * normals1[edge1]);

    // Find the incident edge on poly2.
    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, n2) in normals2.iter().enumerate() {
        let dot = normal1.dot(*n2);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    // Build the clip vertices for the incident edge.
    let i1 = index;
    let i2 = if i1 + 1 < count2 { i1 + 1 } else { 0 };

    let incident = |i: usize| ClipVertex {
        v: xf2.mul_vec2(vertices2[i]),
        id: ContactId {
            cf: ContactFeature {
                index_a: edge1 as u8,
                index_b: i as u8,
                type_a: ContactFeatureType::Face,
                type_b: ContactFeatureType::Vertex,
            },
        },
    };

    [incident(i1), incident(i2)]
}

/// Compute the collision manifold between two polygons.
///
/// Find edge normal of max separation on A - return if separating axis is found
/// Find edge normal of max separation on B - return if separation axis is found
/// Choose reference edge as min(minA, minB)
/// Find incident edge
/// Clip
/// The normal points from 1 to 2
pub fn collide_polygons(
    poly_a: &PolygonShape,
    xf_a: &Transform,
    poly_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = poly_a.radius + poly_b.radius;

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }

    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    let (poly1, poly2, xf1, xf2, edge1, flip) =
        if separation_b > RELATIVE_TOLERANCE * separation_a + ABSOLUTE_TOLERANCE {
            manifold.manifold_type = ManifoldType::FaceB;
            (poly_b, poly_a, xf_b, xf_a, edge_b, true)
        } else {
            manifold.manifold_type = ManifoldType::FaceA;
            (poly_a, poly_b, xf_a, xf_b, edge_a, false)
        };

    let incident_edge = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let count1 = poly1.count();
    let vertices1 = poly1.vertices();

    let iv1 = edge1;
    let iv2 = if edge1 + 1 < count1 { edge1 + 1 } else { 0 };

    let mut v11 = vertices1[iv1];
    let mut v12 = vertices1[iv2];

    let local_tangent = (v12 - v11).normalize();

    let local_normal = local_tangent.cross_scalar(1.0);
    let plane_point = 0.5 * (v11 + v12);

    let tangent = xf1.q * local_tangent;
    let normal = tangent.cross_scalar(1.0);

    v11 = xf1.mul_vec2(v11);
    v12 = xf1.mul_vec2(v12);

    // Face offset.
    let front_offset = normal.dot(v11);

    // Side offsets, extended by polytope skin thickness.
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    // Clip incident edge against extruded edge1 side edges.
    let mut clip_points1 = [ClipVertex::default(); 2];
    let mut clip_points2 = [ClipVertex::default(); 2];

    // Clip to box side 1
    let np = clip_segment_to_line(&mut clip_points1, &incident_edge, -tangent, side_offset1, iv1);
    if np < 2 {
        return manifold;
    }

    // Clip to negative box side 1
    let np = clip_segment_to_line(&mut clip_points2, &clip_points1, tangent, side_offset2, iv2);
    if np < 2 {
        return manifold;
    }

    // Now clip_points2 contains the clipped points.
    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    let mut point_count = 0;
    for clip_point in clip_points2.iter().take(MAX_MANIFOLD_POINTS) {
        let separation = normal.dot(clip_point.v) - front_offset;

        if separation <= total_radius {
            let cp = &mut manifold.points[point_count];
            cp.local_point = xf2.mul_t_vec2(clip_point.v);
            cp.id = clip_point.id;
            if flip {
                // Swap features
                cp.id.cf = cp.id.cf.swapped();
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
    use crate::collision::{get_point_states, PointState, WorldManifold};
    use crate::common::Vec2;

    fn world(
        manifold: &Manifold,
        a: &PolygonShape,
        xf_a: &Transform,
        b: &PolygonShape,
        xf_b: &Transform,
    ) -> WorldManifold {
        WorldManifold::new(manifold, xf_a, a.radius, xf_b, b.radius)
    }

    #[test]
    fn stacked_boxes_produce_two_points() {
        let ground = PolygonShape::new_box(5.0, 0.5);
        let crate_box = PolygonShape::new_box(0.5, 0.5);
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::new(Vec2::new(0.0, 0.95), 0.0);

        let manifold = collide_polygons(&ground, &xf_a, &crate_box, &xf_b);
        assert_eq!(manifold.point_count, 2);
        assert_eq!(manifold.manifold_type, ManifoldType::FaceA);

        let wm = world(&manifold, &ground, &xf_a, &crate_box, &xf_b);
        assert_relative_eq!(wm.normal.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(wm.normal.y, 1.0, epsilon = 1e-6);
        for i in 0..2 {
            assert_relative_eq!(wm.separations[i], -0.05 - 2.0 * ground.radius, epsilon = 1e-5);
        }
    }

    #[test]
    fn separated_boxes_have_no_points() {
        let a = PolygonShape::new_box(1.0, 1.0);
        let xf_b = Transform::new(Vec2::new(2.5, 0.0), 0.3);
        let manifold = collide_polygons(&a, &Transform::IDENTITY, &a, &xf_b);
        assert_eq!(manifold.point_count, 0);
    }

    #[test]
    fn reference_face_prefers_a_on_ties() {
        let a = PolygonShape::new_box(1.0, 1.0);
        let xf_b = Transform::new(Vec2::new(1.9, 0.0), 0.0);
        let manifold = collide_polygons(&a, &Transform::IDENTITY, &a, &xf_b);
        assert_eq!(manifold.manifold_type, ManifoldType::FaceA);
        assert_eq!(manifold.local_normal, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn flipped_reference_swaps_features_and_normal() {
        // A small tilted box resting its corner on a large box B: B's face is
        // the clear reference.
        let small = PolygonShape::new_box(0.5, 0.5);
        let big = PolygonShape::new_box(4.0, 0.5);
        let xf_a = Transform::new(Vec2::new(0.0, 0.5 + 0.7), std::f32::consts::FRAC_PI_4);
        let xf_b = Transform::IDENTITY;

        let manifold = collide_polygons(&small, &xf_a, &big, &xf_b);
        assert_eq!(manifold.manifold_type, ManifoldType::FaceB);
        assert_eq!(manifold.point_count, 1);

        let wm = world(&manifold, &small, &xf_a, &big, &xf_b);
        // Normal still points from A (above) to B (below).
        assert_relative_eq!(wm.normal.y, -1.0, epsilon = 1e-5);
        // Vertex of A against face of B.
        let cf = manifold.points[0].id.cf;
        assert_eq!(cf.type_a, ContactFeatureType::Vertex);
        assert_eq!(cf.type_b, ContactFeatureType::Face);
    }

    #[test]
    fn contact_ids_persist_under_small_motion() {
        let ground = PolygonShape::new_box(5.0, 0.5);
        let crate_box = PolygonShape::new_box(0.5, 0.5);
        let xf_a = Transform::IDENTITY;

        let xf_b1 = Transform::new(Vec2::new(0.0, 0.98), 0.0);
        let xf_b2 = Transform::new(Vec2::new(0.01, 0.97), 0.01);
        let m1 = collide_polygons(&ground, &xf_a, &crate_box, &xf_b1);
        let m2 = collide_polygons(&ground, &xf_a, &crate_box, &xf_b2);
        assert_eq!(m1.point_count, 2);
        assert_eq!(m2.point_count, 2);

        let (state1, state2) = get_point_states(&m1, &m2);
        assert_eq!(state1, [PointState::PersistState; 2]);
        assert_eq!(state2, [PointState::PersistState; 2]);
    }

    #[test]
    fn point_count_never_exceeds_capacity() {
        let a = PolygonShape::new_box(1.0, 1.0);
        let b = PolygonShape::new(&[
            Vec2::new(-0.8, -0.3),
            Vec2::new(0.9, -0.5),
            Vec2::new(1.1, 0.4),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.6),
        ])
        .unwrap();

        for step in 0..64 {
            let angle = step as f32 * 0.1;
            let offset = Vec2::new(angle.cos(), angle.sin()) * 1.7;
            let xf_b = Transform::new(offset, angle * 0.7);
            let manifold = collide_polygons(&a, &Transform::IDENTITY, &b, &xf_b);
            assert!(manifold.point_count <= MAX_MANIFOLD_POINTS);
        }
    }
}
