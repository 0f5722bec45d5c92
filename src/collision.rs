pub mod collide;
pub mod collide_circle;
pub mod collide_edge;
pub mod collide_polygon;
pub mod distance;
pub mod time_of_impact;

pub use collide::collide;
pub use collide_circle::{collide_circles, collide_polygon_and_circle};
pub use collide_edge::{collide_edge_and_circle, collide_edge_and_polygon};
pub use collide_polygon::collide_polygons;
pub use distance::{
    distance, shape_cast, DistanceInput, DistanceOutput, DistanceProxy, ShapeCastInput,
    ShapeCastOutput, SimplexCache,
};
pub use time_of_impact::{time_of_impact, ToiInput, ToiOutput, ToiState, ToiStats};

use crate::{
    common::{Transform, Vec2},
    settings::{Settings, MAX_MANIFOLD_POINTS},
    shape::Shape,
};

/// The features that intersect to form the contact point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContactFeatureType {
    #[default]
    Vertex = 0,
    Face = 1,
}

/// The features that intersect to form the contact point.
/// This must be 4 bytes or less.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactFeature {
    /// Feature index on shapeA
    pub index_a: u8,
    /// Feature index on shapeB
    pub index_b: u8,
    /// The feature type on shapeA
    pub type_a: ContactFeatureType,
    /// The feature type on shapeB
    pub type_b: ContactFeatureType,
}

impl ContactFeature {
    /// Exchange the A and B features.
    #[inline]
    pub fn swapped(self) -> Self {
        Self {
            index_a: self.index_b,
            index_b: self.index_a,
            type_a: self.type_b,
            type_b: self.type_a,
        }
    }
}

/// Contact ids to facilitate warm starting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactId {
    pub cf: ContactFeature,
}

impl ContactId {
    pub const ZERO: Self = Self {
        cf: ContactFeature {
            index_a: 0,
            index_b: 0,
            type_a: ContactFeatureType::Vertex,
            type_b: ContactFeatureType::Vertex,
        },
    };

    /// Used to quickly compare contact ids.
    #[inline]
    pub fn key(&self) -> u32 {
        u32::from_le_bytes([
            self.cf.index_a,
            self.cf.index_b,
            self.cf.type_a as u8,
            self.cf.type_b as u8,
        ])
    }
}

/// A manifold point is a contact point belonging to a contact
/// manifold. It holds details related to the geometry and dynamics
/// of the contact points.
/// The local point usage depends on the manifold type:
/// - Circles: the local center of circleB
/// - FaceA: the local center of circleB or the clip point of polygonB
/// - FaceB: the clip point of polygonA
/// This structure is stored across time steps, so we keep it small.
/// Note: the impulses are used for internal caching and may not
/// provide reliable contact forces, especially for high speed collisions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManifoldPoint {
    /// Usage depends on manifold type.
    pub local_point: Vec2,
    /// The non-penetration impulse.
    pub normal_impulse: f32,
    /// The friction impulse.
    pub tangent_impulse: f32,
    /// Uniquely identifies a contact point between two shapes.
    pub id: ContactId,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ManifoldType {
    #[default]
    Circles,
    FaceA,
    FaceB,
}

/// A manifold for two touching convex shapes.
/// Box2D supports multiple types of contact:
/// - clip point versus plane with radius
/// - point versus point with radius (circles)
/// The local point usage depends on the manifold type:
/// - Circles: the local center of circleA
/// - FaceA: the center of faceA
/// - FaceB: the center of faceB
/// Similarly the local normal usage:
/// - Circles: not used
/// - FaceA: the normal on polygonA
/// - FaceB: the normal on polygonB
/// We store contacts in this way so that position correction can
/// account for movement, which is critical for continuous physics.
/// All contact scenarios must be expressed in one of these types.
/// This structure is stored across time steps, so we keep it small.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Manifold {
    /// The points of contact.
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    /// Not used for ManifoldType::Circles.
    pub local_normal: Vec2,
    /// Usage depends on manifold type.
    pub local_point: Vec2,
    pub manifold_type: ManifoldType,
    /// The number of manifold points.
    pub point_count: usize,
}

impl Manifold {
    /// The active points.
    #[inline]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    /// Re-express this manifold with the roles of shape A and shape B
    /// exchanged. Used when a collider only exists for the reverse pair.
    pub fn swap_roles(&mut self) {
        match self.manifold_type {
            ManifoldType::Circles => {
                if self.point_count > 0 {
                    std::mem::swap(&mut self.local_point, &mut self.points[0].local_point);
                }
            }
            ManifoldType::FaceA => self.manifold_type = ManifoldType::FaceB,
            ManifoldType::FaceB => self.manifold_type = ManifoldType::FaceA,
        }
        for point in self.points.iter_mut().take(self.point_count) {
            point.id.cf = point.id.cf.swapped();
        }
    }
}

/// This is used to compute the current state of a contact manifold.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldManifold {
    /// World vector pointing from A to B.
    pub normal: Vec2,
    /// World contact point (point of intersection).
    pub points: [Vec2; MAX_MANIFOLD_POINTS],
    /// A negative value indicates overlap, in meters.
    pub separations: [f32; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    /// Evaluate the manifold with supplied transforms. This assumes
    /// modest motion from the original state. This does not change the
    /// point count, impulses, etc. The radii must come from the shapes
    /// that generated the manifold.
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut world = Self::default();
        if manifold.point_count == 0 {
            return world;
        }

        match manifold.manifold_type {
            ManifoldType::Circles => {
                let mut normal = Vec2::Y;
                let point_a = xf_a.mul_vec2(manifold.local_point);
                let point_b = xf_b.mul_vec2(manifold.points[0].local_point);
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    normal = (point_b - point_a).normalize();
                }

                let c_a = point_a + radius_a * normal;
                let c_b = point_b - radius_b * normal;
                world.normal = normal;
                world.points[0] = 0.5 * (c_a + c_b);
                world.separations[0] = (c_b - c_a).dot(normal);
            }
            ManifoldType::FaceA => {
                let normal = xf_a.q * manifold.local_normal;
                let plane_point = xf_a.mul_vec2(manifold.local_point);

                for i in 0..manifold.point_count {
                    let clip_point = xf_b.mul_vec2(manifold.points[i].local_point);
                    let depth = (clip_point - plane_point).dot(normal);
                    let c_a = clip_point + (radius_a - depth) * normal;
                    let c_b = clip_point - radius_b * normal;
                    world.points[i] = 0.5 * (c_a + c_b);
                    world.separations[i] = (c_b - c_a).dot(normal);
                }
                world.normal = normal;
            }
            ManifoldType::FaceB => {
                let normal = xf_b.q * manifold.local_normal;
                let plane_point = xf_b.mul_vec2(manifold.local_point);

                for i in 0..manifold.point_count {
                    let clip_point = xf_a.mul_vec2(manifold.points[i].local_point);
                    let depth = (clip_point - plane_point).dot(normal);
                    let c_b = clip_point + (radius_b - depth) * normal;
                    let c_a = clip_point - radius_a * normal;
                    world.points[i] = 0.5 * (c_a + c_b);
                    world.separations[i] = (c_a - c_b).dot(normal);
                }

                // Ensure normal points from A to B.
                world.normal = -normal;
            }
        }

        world
    }
}

/// This is used for determining the state of contact points.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PointState {
    /// point does not exist
    #[default]
    NullState,
    /// point was added in the update
    AddState,
    /// point persisted across the update
    PersistState,
    /// point was removed in the update
    RemoveState,
}

/// Compute the point states given two manifolds. The states pertain to the
/// transition from manifold1 to manifold2. So state1 is either persist or
/// remove while state2 is either add or persist.
pub fn get_point_states(
    manifold1: &Manifold,
    manifold2: &Manifold,
) -> ([PointState; MAX_MANIFOLD_POINTS], [PointState; MAX_MANIFOLD_POINTS]) {
    let mut state1 = [PointState::NullState; MAX_MANIFOLD_POINTS];
    let mut state2 = [PointState::NullState; MAX_MANIFOLD_POINTS];

    // Detect persists and removes.
    for (i, point) in manifold1.points().iter().enumerate() {
        let key = point.id.key();
        state1[i] = if manifold2.points().iter().any(|p| p.id.key() == key) {
            PointState::PersistState
        } else {
            PointState::RemoveState
        };
    }

    // Detect persists and adds.
    for (i, point) in manifold2.points().iter().enumerate() {
        let key = point.id.key();
        state2[i] = if manifold1.points().iter().any(|p| p.id.key() == key) {
            PointState::PersistState
        } else {
            PointState::AddState
        };
    }

    (state1, state2)
}

/// Used for computing contact manifolds.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClipVertex {
    pub v: Vec2,
    pub id: ContactId,
}

/// Clipping for contact manifolds. Sutherland-Hodgman clipping of a segment
/// against the half plane `dot(normal, v) <= offset`. Returns the number of
/// points written to `v_out`.
pub fn clip_segment_to_line(
    v_out: &mut [ClipVertex; 2],
    v_in: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: usize,
) -> usize {
    // Start with no output points
    let mut num_out = 0;

    // Calculate the distance of end points to the line
    let distance0 = normal.dot(v_in[0].v) - offset;
    let distance1 = normal.dot(v_in[1].v) - offset;

    // If the points are behind the plane
    if distance0 <= 0.0 {
        v_out[num_out] = v_in[0];
        num_out += 1;
    }
    if distance1 <= 0.0 {
        v_out[num_out] = v_in[1];
        num_out += 1;
    }

    // If the points are on different sides of the plane
    if distance0 * distance1 < 0.0 {
        // Find intersection point of edge and plane
        let interp = distance0 / (distance0 - distance1);
        v_out[num_out] = ClipVertex {
            v: v_in[0].v + interp * (v_in[1].v - v_in[0].v),
            // VertexA is hitting edgeB.
            id: ContactId {
                cf: ContactFeature {
                    index_a: vertex_index_a as u8,
                    index_b: v_in[0].id.cf.index_b,
                    type_a: ContactFeatureType::Vertex,
                    type_b: ContactFeatureType::Face,
                },
            },
        };
        num_out += 1;

        debug_assert_eq!(num_out, 2);
    }

    num_out
}

/// An axis aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// The lower vertex.
    pub lower_bound: Vec2,
    /// The upper vertex.
    pub upper_bound: Vec2,
}

impl Aabb {
    /// Bound a set of local points placed by `xf`, inflated by `radius`.
    pub fn from_points(xf: &Transform, points: &[Vec2], radius: f32) -> Self {
        debug_assert!(!points.is_empty());
        let first = xf.mul_vec2(points[0]);
        let (lower, upper) = points[1..].iter().fold((first, first), |(lower, upper), p| {
            let v = xf.mul_vec2(*p);
            (lower.min(v), upper.max(v))
        });
        let r = Vec2::splat(radius);
        Self {
            lower_bound: lower - r,
            upper_bound: upper + r,
        }
    }

    /// Verify that the bounds are sorted.
    pub fn is_valid(&self) -> bool {
        let d = self.upper_bound - self.lower_bound;
        d.x >= 0.0 && d.y >= 0.0 && self.lower_bound.is_finite() && self.upper_bound.is_finite()
    }

    /// Get the center of the AABB.
    #[inline]
    pub fn center(&self) -> Vec2 {
        0.5 * (self.lower_bound + self.upper_bound)
    }

    /// Get the extents of the AABB (half-widths).
    #[inline]
    pub fn extents(&self) -> Vec2 {
        0.5 * (self.upper_bound - self.lower_bound)
    }

    /// Get the perimeter length
    pub fn get_perimeter(&self) -> f32 {
        let wx = self.upper_bound.x - self.lower_bound.x;
        let wy = self.upper_bound.y - self.lower_bound.y;
        2.0 * (wx + wy)
    }

    /// Combine this AABBs with another.
    #[inline]
    pub fn combine(&self, other: &Aabb) -> Self {
        Self {
            lower_bound: self.lower_bound.min(other.lower_bound),
            upper_bound: self.upper_bound.max(other.upper_bound),
        }
    }

    /// Is the given AABB contained within this AABB?
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.lower_bound.x <= other.lower_bound.x
            && self.lower_bound.y <= other.lower_bound.y
            && self.upper_bound.x >= other.upper_bound.x
            && self.upper_bound.y >= other.upper_bound.y
    }

    /// Do the two boxes overlap?
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d1 = other.lower_bound - self.upper_bound;
        let d2 = self.lower_bound - other.upper_bound;
        !(d1.x > 0.0 || d1.y > 0.0 || d2.x > 0.0 || d2.y > 0.0)
    }
}

/// Determine if two generic shapes overlap.
pub fn test_overlap(
    shape_a: &Shape,
    index_a: usize,
    shape_b: &Shape,
    index_b: usize,
    xf_a: &Transform,
    xf_b: &Transform,
    settings: &Settings,
) -> bool {
    let input = DistanceInput {
        proxy_a: DistanceProxy::from_shape(shape_a, index_a),
        proxy_b: DistanceProxy::from_shape(shape_b, index_b),
        transform_a: *xf_a,
        transform_b: *xf_b,
        use_radii: true,
    };

    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input, settings);

    output.distance < 10.0 * settings.epsilon
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{CircleShape, PolygonShape};

    fn clip_vertex(x: f32, y: f32, index_b: u8) -> ClipVertex {
        ClipVertex {
            v: Vec2::new(x, y),
            id: ContactId {
                cf: ContactFeature {
                    index_a: 0,
                    index_b,
                    type_a: ContactFeatureType::Face,
                    type_b: ContactFeatureType::Vertex,
                },
            },
        }
    }

    #[test]
    fn clip_keeps_segment_behind_plane() {
        let v_in = [clip_vertex(-1.0, 0.0, 0), clip_vertex(-0.5, 1.0, 1)];
        let mut v_out = [ClipVertex::default(); 2];
        let np = clip_segment_to_line(&mut v_out, &v_in, Vec2::X, 0.0, 3);
        assert_eq!(np, 2);
        assert_eq!(v_out[0].v, v_in[0].v);
        assert_eq!(v_out[1].id, v_in[1].id);
    }

    #[test]
    fn clip_splits_crossing_segment() {
        let v_in = [clip_vertex(-1.0, 0.0, 4), clip_vertex(1.0, 2.0, 5)];
        let mut v_out = [ClipVertex::default(); 2];
        let np = clip_segment_to_line(&mut v_out, &v_in, Vec2::X, 0.0, 7);
        assert_eq!(np, 2);
        assert_eq!(v_out[1].v, Vec2::new(0.0, 1.0));
        assert_eq!(v_out[1].id.cf.index_a, 7);
        assert_eq!(v_out[1].id.cf.index_b, 4);
        assert_eq!(v_out[1].id.cf.type_a, ContactFeatureType::Vertex);
        assert_eq!(v_out[1].id.cf.type_b, ContactFeatureType::Face);
    }

    #[test]
    fn clip_drops_segment_in_front_of_plane() {
        let v_in = [clip_vertex(1.0, 0.0, 0), clip_vertex(2.0, 0.0, 1)];
        let mut v_out = [ClipVertex::default(); 2];
        assert_eq!(clip_segment_to_line(&mut v_out, &v_in, Vec2::X, 0.0, 0), 0);
    }

    #[test]
    fn contact_key_distinguishes_features() {
        let a = ContactId {
            cf: ContactFeature {
                index_a: 1,
                index_b: 2,
                type_a: ContactFeatureType::Face,
                type_b: ContactFeatureType::Vertex,
            },
        };
        let b = ContactId { cf: a.cf.swapped() };
        assert_ne!(a.key(), b.key());
        assert_eq!(b.cf.swapped(), a.cf);
        assert_eq!(ContactId::ZERO.key(), 0);
    }

    #[test]
    fn point_states_track_ids() {
        let mut old = Manifold::default();
        old.point_count = 2;
        old.points[0].id.cf.index_b = 1;
        old.points[1].id.cf.index_b = 2;

        let mut new = Manifold::default();
        new.point_count = 2;
        new.points[0].id.cf.index_b = 2;
        new.points[1].id.cf.index_b = 3;

        let (state1, state2) = get_point_states(&old, &new);
        assert_eq!(state1, [PointState::RemoveState, PointState::PersistState]);
        assert_eq!(state2, [PointState::PersistState, PointState::AddState]);
    }

    #[test]
    fn empty_manifold_has_no_world_points() {
        let xf = Transform::IDENTITY;
        let world = WorldManifold::new(&Manifold::default(), &xf, 1.0, &xf, 1.0);
        assert_eq!(world, WorldManifold::default());
    }

    #[test]
    fn aabb_combine_and_overlap() {
        let a = Aabb {
            lower_bound: Vec2::ZERO,
            upper_bound: Vec2::ONE,
        };
        let b = Aabb {
            lower_bound: Vec2::new(2.0, 2.0),
            upper_bound: Vec2::new(3.0, 3.0),
        };
        assert!(!a.overlaps(&b));
        let c = a.combine(&b);
        assert!(c.contains(&a) && c.contains(&b));
        assert!(c.is_valid());
        assert_eq!(c.center(), Vec2::new(1.5, 1.5));
        assert_eq!(c.get_perimeter(), 12.0);
    }

    #[test]
    fn overlap_test_uses_skin() {
        let settings = Settings::default();
        let circle = Shape::from(CircleShape::new(Vec2::ZERO, 0.5));
        let square = Shape::from(PolygonShape::new_box(0.5, 0.5));
        let near = Transform::new(Vec2::new(0.9, 0.0), 0.0);
        let far = Transform::new(Vec2::new(1.1, 0.0), 0.0);
        assert!(test_overlap(&circle, 0, &square, 0, &Transform::IDENTITY, &near, &settings));
        assert!(!test_overlap(&circle, 0, &square, 0, &Transform::IDENTITY, &far, &settings));
    }
}
