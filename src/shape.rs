use thiserror::Error;

use crate::{
    collision::Aabb,
    common::{Rot, Transform, Vec2, Vec2Ext},
    settings::{LINEAR_SLOP, MAX_POLYGON_VERTICES, POLYGON_RADIUS},
};

/// Invalid geometry handed to a shape constructor.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon has {0} vertices, the maximum is {MAX_POLYGON_VERTICES}")]
    TooManyVertices(usize),
    #[error("polygon vertices are collinear")]
    DegenerateHull,
    #[error("chain needs at least {min} vertices, got {count}")]
    ChainTooShort { count: usize, min: usize },
    #[error("chain vertices {0} and {1} are too close together")]
    ChainVerticesTooClose(usize, usize),
}

/// A solid circle shape.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircleShape {
    /// Position
    pub p: Vec2,
    pub radius: f32,
}

impl CircleShape {
    pub fn new(p: Vec2, radius: f32) -> Self {
        Self { p, radius }
    }
}

/// A solid convex polygon. It is assumed that the interior of the polygon is
/// to the left of each edge.
/// Polygons have a maximum number of vertices equal to MAX_POLYGON_VERTICES.
/// In most cases you should not need many vertices for a convex polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolygonShape {
    pub centroid: Vec2,
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    normals: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
    pub radius: f32,
}

impl PolygonShape {
    /// Create a convex hull from the given points. Points closer than half
    /// the linear slop are welded together.
    pub fn new(points: &[Vec2]) -> Result<Self, ShapeError> {
        if points.len() < 3 {
            return Err(ShapeError::TooFewVertices(points.len()));
        }
        if points.len() > MAX_POLYGON_VERTICES {
            return Err(ShapeError::TooManyVertices(points.len()));
        }

        // Perform welding and copy vertices into local buffer.
        let mut ps = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut n = 0;
        let weld = 0.5 * LINEAR_SLOP;
        for &v in points {
            if ps[..n].iter().all(|p| v.distance_squared(*p) >= weld * weld) {
                ps[n] = v;
                n += 1;
            }
        }

        if n < 3 {
            return Err(ShapeError::TooFewVertices(n));
        }

        // Create the convex hull using the gift wrapping algorithm
        // http://en.wikipedia.org/wiki/Gift_wrapping_algorithm

        // Find the right most point on the hull
        let mut i0 = 0;
        let mut x0 = ps[0].x;
        for i in 1..n {
            let x = ps[i].x;
            if x > x0 || (x == x0 && ps[i].y < ps[i0].y) {
                i0 = i;
                x0 = x;
            }
        }

        let mut hull = [0usize; MAX_POLYGON_VERTICES];
        let mut m = 0;
        let mut ih = i0;

        loop {
            if m == MAX_POLYGON_VERTICES {
                return Err(ShapeError::DegenerateHull);
            }
            hull[m] = ih;

            let mut ie = 0;
            for j in 1..n {
                if ie == ih {
                    ie = j;
                    continue;
                }

                let r = ps[ie] - ps[hull[m]];
                let v = ps[j] - ps[hull[m]];
                let c = r.cross(v);
                if c < 0.0 {
                    ie = j;
                }

                // Collinearity check
                if c == 0.0 && v.length_squared() > r.length_squared() {
                    ie = j;
                }
            }

            m += 1;
            ih = ie;

            if ie == i0 {
                break;
            }
        }

        if m < 3 {
            return Err(ShapeError::DegenerateHull);
        }

        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        for i in 0..m {
            vertices[i] = ps[hull[i]];
        }

        // Compute normals. Ensure the edges have non-zero length.
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        for i in 0..m {
            let i2 = if i + 1 < m { i + 1 } else { 0 };
            let mut normal = (vertices[i2] - vertices[i]).cross_scalar(1.0);
            if normal.normalize_len() == 0.0 {
                return Err(ShapeError::DegenerateHull);
            }
            normals[i] = normal;
        }

        let centroid = compute_centroid(&vertices[..m]).ok_or(ShapeError::DegenerateHull)?;

        Ok(Self {
            centroid,
            vertices,
            normals,
            count: m,
            radius: POLYGON_RADIUS,
        })
    }

    /// Build vertices to represent an axis-aligned box centered on the local
    /// origin.
    pub fn new_box(hx: f32, hy: f32) -> Self {
        Self::new_oriented_box(hx, hy, Vec2::ZERO, 0.0)
    }

    /// Build vertices to represent an oriented box.
    pub fn new_oriented_box(hx: f32, hy: f32, center: Vec2, angle: f32) -> Self {
        debug_assert!(hx > 0.0 && hy > 0.0);
        let xf = Transform {
            p: center,
            q: Rot::new(angle),
        };

        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let corners = [
            Vec2::new(-hx, -hy),
            Vec2::new(hx, -hy),
            Vec2::new(hx, hy),
            Vec2::new(-hx, hy),
        ];
        let box_normals = [
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.0),
        ];
        for i in 0..4 {
            vertices[i] = xf.mul_vec2(corners[i]);
            normals[i] = xf.q * box_normals[i];
        }

        Self {
            centroid: center,
            vertices,
            normals,
            count: 4,
            radius: POLYGON_RADIUS,
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    #[inline]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }

    /// Test a point for containment in this shape. This only works for
    /// convex shapes.
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let p_local = xf.q.mul_t_vec2(p - xf.p);
        self.vertices()
            .iter()
            .zip(self.normals())
            .all(|(v, n)| n.dot(p_local - *v) <= 0.0)
    }
}

fn compute_centroid(vs: &[Vec2]) -> Option<Vec2> {
    let mut c = Vec2::ZERO;
    let mut area = 0.0;

    // Get a reference point for forming triangles.
    // Use the first vertex to reduce round-off errors.
    let s = vs[0];

    let inv3 = 1.0 / 3.0;

    for i in 0..vs.len() {
        // Triangle vertices.
        let p1 = vs[0] - s;
        let p2 = vs[i] - s;
        let p3 = if i + 1 < vs.len() { vs[i + 1] - s } else { vs[0] - s };

        let e1 = p2 - p1;
        let e2 = p3 - p1;

        let d = e1.cross(e2);

        let triangle_area = 0.5 * d;
        area += triangle_area;

        // Area weighted centroid
        c += triangle_area * inv3 * (p1 + p2 + p3);
    }

    if area <= f32::EPSILON {
        return None;
    }

    Some(c / area + s)
}

/// A line segment (edge) shape. These can be connected in chains or loops
/// to other edge shapes. Edges created independently are two-sided and do
/// no provide smooth movement across junctions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeShape {
    /// These are the edge vertices
    pub vertex1: Vec2,
    pub vertex2: Vec2,

    /// Optional adjacent vertices. These are used for smooth collision.
    pub vertex0: Vec2,
    pub vertex3: Vec2,

    /// Uses vertex0 and vertex3 to create smooth collision.
    pub one_sided: bool,

    pub radius: f32,
}

impl EdgeShape {
    /// Set this as an isolated edge. Collision is two-sided.
    pub fn new_two_sided(v1: Vec2, v2: Vec2) -> Self {
        Self {
            vertex1: v1,
            vertex2: v2,
            vertex0: Vec2::ZERO,
            vertex3: Vec2::ZERO,
            one_sided: false,
            radius: POLYGON_RADIUS,
        }
    }

    /// Set this as a part of a sequence. Vertex v0 precedes the edge and
    /// vertex v3 follows. These extra vertices are used to provide smooth
    /// movement across junctions. This also makes the collision one-sided.
    /// The edge normal points to the right looking from v1 to v2.
    pub fn new_one_sided(v0: Vec2, v1: Vec2, v2: Vec2, v3: Vec2) -> Self {
        Self {
            vertex1: v1,
            vertex2: v2,
            vertex0: v0,
            vertex3: v3,
            one_sided: true,
            radius: POLYGON_RADIUS,
        }
    }
}

/// A chain shape is a free form sequence of line segments.
/// The chain has one-sided collision, with the surface normal pointing to the right of the edge.
/// This provides a counter-clockwise winding like the polygon shape.
/// Connectivity information is used to create smooth collisions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainShape {
    vertices: Vec<Vec2>,
    pub prev_vertex: Vec2,
    pub next_vertex: Vec2,
    pub radius: f32,
}

impl ChainShape {
    /// Create a loop. This automatically adjusts connectivity.
    pub fn new_loop(points: &[Vec2]) -> Result<Self, ShapeError> {
        if points.len() < 3 {
            return Err(ShapeError::ChainTooShort {
                count: points.len(),
                min: 3,
            });
        }
        Self::validate(points)?;

        let mut vertices = points.to_vec();
        vertices.push(points[0]);
        let count = vertices.len();

        Ok(Self {
            prev_vertex: vertices[count - 2],
            next_vertex: vertices[1],
            vertices,
            radius: POLYGON_RADIUS,
        })
    }

    /// Create a chain with ghost vertices to connect multiple chains together.
    pub fn new_chain(
        points: &[Vec2],
        prev_vertex: Vec2,
        next_vertex: Vec2,
    ) -> Result<Self, ShapeError> {
        if points.len() < 2 {
            return Err(ShapeError::ChainTooShort {
                count: points.len(),
                min: 2,
            });
        }
        Self::validate(points)?;

        Ok(Self {
            vertices: points.to_vec(),
            prev_vertex,
            next_vertex,
            radius: POLYGON_RADIUS,
        })
    }

    fn validate(points: &[Vec2]) -> Result<(), ShapeError> {
        let min = LINEAR_SLOP * LINEAR_SLOP;
        for (i, pair) in points.windows(2).enumerate() {
            if pair[0].distance_squared(pair[1]) <= min {
                return Err(ShapeError::ChainVerticesTooClose(i, i + 1));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// The number of child edges.
    #[inline]
    pub fn child_count(&self) -> usize {
        self.vertices.len() - 1
    }

    /// Get a child edge.
    pub fn child_edge(&self, index: usize) -> EdgeShape {
        debug_assert!(index < self.child_count());
        let count = self.vertices.len();

        let v0 = if index > 0 {
            self.vertices[index - 1]
        } else {
            self.prev_vertex
        };
        let v3 = if index + 2 < count {
            self.vertices[index + 2]
        } else {
            self.next_vertex
        };

        EdgeShape {
            radius: self.radius,
            ..EdgeShape::new_one_sided(v0, self.vertices[index], self.vertices[index + 1], v3)
        }
    }
}

/// A shape is used for collision detection. Shapes are created with their
/// geometry in the local frame of their body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    Circle(CircleShape),
    Polygon(PolygonShape),
    Edge(EdgeShape),
    Chain(ChainShape),
}

impl Shape {
    /// The skin radius of the shape.
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(circle) => circle.radius,
            Shape::Polygon(polygon) => polygon.radius,
            Shape::Edge(edge) => edge.radius,
            Shape::Chain(chain) => chain.radius,
        }
    }

    /// Get the number of child primitives.
    pub fn child_count(&self) -> usize {
        match self {
            Shape::Chain(chain) => chain.child_count(),
            _ => 1,
        }
    }

    /// Given a transform, compute the associated axis aligned bounding box
    /// for a child shape.
    pub fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb {
        match self {
            Shape::Circle(circle) => {
                let p = xf.mul_vec2(circle.p);
                let r = Vec2::splat(circle.radius);
                Aabb {
                    lower_bound: p - r,
                    upper_bound: p + r,
                }
            }
            Shape::Polygon(polygon) => Aabb::from_points(xf, polygon.vertices(), polygon.radius),
            Shape::Edge(edge) => Aabb::from_points(xf, &[edge.vertex1, edge.vertex2], edge.radius),
            Shape::Chain(chain) => {
                let edge = chain.child_edge(child_index);
                Aabb::from_points(xf, &[edge.vertex1, edge.vertex2], chain.radius)
            }
        }
    }
}

impl From<CircleShape> for Shape {
    fn from(shape: CircleShape) -> Self {
        Shape::Circle(shape)
    }
}

impl From<PolygonShape> for Shape {
    fn from(shape: PolygonShape) -> Self {
        Shape::Polygon(shape)
    }
}

impl From<EdgeShape> for Shape {
    fn from(shape: EdgeShape) -> Self {
        Shape::Edge(shape)
    }
}

impl From<ChainShape> for Shape {
    fn from(shape: ChainShape) -> Self {
        Shape::Chain(shape)
    }
}
