use crate::{
    common::{scalar_cross, Transform, Vec2, Vec2Ext},
    settings::{Settings, MAX_POLYGON_VERTICES},
    shape::{Shape, ShapeError},
};

/// A distance proxy is used by the GJK algorithm.
/// It encapsulates any shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceProxy {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
    pub radius: f32,
}

impl DistanceProxy {
    /// Initialize the proxy using the given shape. The vertices are copied,
    /// so the proxy does not borrow the shape.
    pub fn from_shape(shape: &Shape, index: usize) -> Self {
        match shape {
            Shape::Circle(circle) => Self::new(&[circle.p], circle.radius),
            Shape::Polygon(polygon) => Self::new(polygon.vertices(), polygon.radius),
            Shape::Chain(chain) => {
                let vertices = chain.vertices();
                debug_assert!(index < chain.child_count());
                let next = if index + 1 < vertices.len() { index + 1 } else { 0 };
                Self::new(&[vertices[index], vertices[next]], chain.radius)
            }
            Shape::Edge(edge) => Self::new(&[edge.vertex1, edge.vertex2], edge.radius),
        }
    }

    /// Initialize the proxy using a vertex cloud and radius.
    ///
    /// At most `MAX_POLYGON_VERTICES` vertices are kept; any beyond that are
    /// dropped and ignored by support queries. Use [`DistanceProxy::try_new`]
    /// for clouds that may exceed the cap.
    pub fn new(vertices: &[Vec2], radius: f32) -> Self {
        debug_assert!(!vertices.is_empty() && vertices.len() <= MAX_POLYGON_VERTICES);
        let count = vertices.len().min(MAX_POLYGON_VERTICES);
        let mut buffer = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        buffer[..count].copy_from_slice(&vertices[..count]);
        Self {
            vertices: buffer,
            count,
            radius,
        }
    }

    /// Initialize the proxy, rejecting empty clouds and clouds with more than
    /// `MAX_POLYGON_VERTICES` vertices.
    pub fn try_new(vertices: &[Vec2], radius: f32) -> Result<Self, ShapeError> {
        if vertices.is_empty() {
            return Err(ShapeError::TooFewVertices(0));
        }
        if vertices.len() > MAX_POLYGON_VERTICES {
            return Err(ShapeError::TooManyVertices(vertices.len()));
        }
        Ok(Self::new(vertices, radius))
    }

    /// Get the supporting vertex index in the given direction.
    pub fn get_support(&self, d: Vec2) -> usize {
        let mut best_index = 0;
        let mut best_value = self.vertices[0].dot(d);
        for (i, v) in self.vertices().iter().enumerate().skip(1) {
            let value = v.dot(d);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }

        best_index
    }

    /// Get the supporting vertex in the given direction.
    #[inline]
    pub fn get_support_vertex(&self, d: Vec2) -> Vec2 {
        self.vertices[self.get_support(d)]
    }

    /// Get the vertex count.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    /// Get a vertex by index. Used by `distance`.
    #[inline]
    pub fn vertex(&self, index: usize) -> Vec2 {
        debug_assert!(index < self.count);
        self.vertices[index]
    }
}

/// Used to warm start `distance`.
/// Set count to zero on first call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplexCache {
    /// length or area
    pub metric: f32,
    pub count: u16,
    /// vertices on shape A
    pub index_a: [u8; 3],
    /// vertices on shape B
    pub index_b: [u8; 3],
}

/// Input for `distance`.
/// You have the option to use the shape radii
/// in the computation.
#[derive(Debug, Clone, Copy)]
pub struct DistanceInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub transform_a: Transform,
    pub transform_b: Transform,
    pub use_radii: bool,
}

/// Output for `distance`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistanceOutput {
    /// closest point on shapeA
    pub point_a: Vec2,
    /// closest point on shapeB
    pub point_b: Vec2,
    pub distance: f32,
    /// number of GJK iterations used
    pub iterations: usize,
}

/// Input parameters for `shape_cast`
#[derive(Debug, Clone, Copy)]
pub struct ShapeCastInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub transform_a: Transform,
    pub transform_b: Transform,
    pub translation_b: Vec2,
}

/// Output results for `shape_cast`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShapeCastOutput {
    pub point: Vec2,
    pub normal: Vec2,
    pub lambda: f32,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SimplexVertex {
    /// support point in proxyA
    w_a: Vec2,
    /// support point in proxyB
    w_b: Vec2,
    /// wB - wA
    w: Vec2,
    /// barycentric coordinate for closest point
    a: f32,
    /// wA index
    index_a: usize,
    /// wB index
    index_b: usize,
}

impl SimplexVertex {
    fn new(
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        index_a: usize,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
        index_b: usize,
    ) -> Self {
        let w_a = xf_a.mul_vec2(proxy_a.vertex(index_a));
        let w_b = xf_b.mul_vec2(proxy_b.vertex(index_b));
        Self {
            w_a,
            w_b,
            w: w_b - w_a,
            a: 1.0,
            index_a,
            index_b,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    /// Rebuild the simplex from a warm start cache. A cache whose indices do
    /// not fit the proxies, or whose metric drifted too far, is treated as
    /// empty.
    fn read_cache(
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
        epsilon: f32,
    ) -> Self {
        let mut simplex = Self::default();

        let count = cache.count as usize;
        let valid = count <= 3
            && (0..count).all(|i| {
                (cache.index_a[i] as usize) < proxy_a.count()
                    && (cache.index_b[i] as usize) < proxy_b.count()
            });

        if valid {
            // Copy data from cache.
            for i in 0..count {
                simplex.v[i] = SimplexVertex::new(
                    proxy_a,
                    xf_a,
                    cache.index_a[i] as usize,
                    proxy_b,
                    xf_b,
                    cache.index_b[i] as usize,
                );
                simplex.v[i].a = 0.0;
            }
            simplex.count = count;

            // Compute the new simplex metric, if it is substantially different than
            // old metric then flush the simplex.
            if simplex.count > 1 {
                let metric1 = cache.metric;
                let metric2 = simplex.get_metric();
                if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < epsilon {
                    // Reset the simplex.
                    simplex.count = 0;
                }
            }
        } else if count > 0 {
            log::trace!("discarding stale simplex cache with {count} vertices");
        }

        // If the cache is empty or invalid ...
        if simplex.count == 0 {
            simplex.v[0] = SimplexVertex::new(proxy_a, xf_a, 0, proxy_b, xf_b, 0);
            simplex.count = 1;
        }

        simplex
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.get_metric();
        cache.count = self.count as u16;
        for (i, v) in self.vertices().iter().enumerate() {
            cache.index_a[i] = v.index_a as u8;
            cache.index_b[i] = v.index_b as u8;
        }
    }

    #[inline]
    fn vertices(&self) -> &[SimplexVertex] {
        &self.v[..self.count]
    }

    fn get_search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = e12.cross(-self.v[0].w);
                if sgn > 0.0 {
                    // Origin is left of e12.
                    scalar_cross(1.0, e12)
                } else {
                    // Origin is right of e12.
                    e12.cross_scalar(1.0)
                }
            }
            _ => {
                debug_assert!(false, "invalid simplex count {}", self.count);
                Vec2::ZERO
            }
        }
    }

    fn get_closest_point(&self) -> Vec2 {
        match self.count {
            1 => self.v[0].w,
            2 => self.v[0].a * self.v[0].w + self.v[1].a * self.v[1].w,
            3 => Vec2::ZERO,
            _ => {
                debug_assert!(false, "invalid simplex count {}", self.count);
                Vec2::ZERO
            }
        }
    }

    /// Returns the witness points (on A, on B).
    fn get_witness_points(&self) -> (Vec2, Vec2) {
        match self.count {
            1 => (self.v[0].w_a, self.v[0].w_b),
            2 => (
                self.v[0].a * self.v[0].w_a + self.v[1].a * self.v[1].w_a,
                self.v[0].a * self.v[0].w_b + self.v[1].a * self.v[1].w_b,
            ),
            3 => {
                let p = self.v[0].a * self.v[0].w_a
                    + self.v[1].a * self.v[1].w_a
                    + self.v[2].a * self.v[2].w_a;
                (p, p)
            }
            _ => {
                debug_assert!(false, "invalid simplex count {}", self.count);
                (Vec2::ZERO, Vec2::ZERO)
            }
        }
    }

    fn get_metric(&self) -> f32 {
        match self.count {
            1 => 0.0,
            2 => self.v[0].w.distance(self.v[1].w),
            3 => (self.v[1].w - self.v[0].w).cross(self.v[2].w - self.v[0].w),
            _ => {
                debug_assert!(false, "invalid simplex count {}", self.count);
                0.0
            }
        }
    }

    // Solve a line segment using barycentric coordinates.
    //
    // p = a1 * w1 + a2 * w2
    // a1 + a2 = 1
    //
    // The vector from the origin to the closest point on the line is
    // perpendicular to the line.
    // e12 = w2 - w1
    // dot(p, e) = 0
    // a1 * dot(w1, e) + a2 * dot(w2, e) = 0
    //
    // 2-by-2 linear system
    // [1      1     ][a1] = [1]
    // [w1.e12 w2.e12][a2] = [0]
    //
    // Define
    // d12_1 =  dot(w2, e12)
    // d12_2 = -dot(w1, e12)
    // d12 = d12_1 + d12_2
    //
    // Solution
    // a1 = d12_1 / d12
    // a2 = d12_2 / d12
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        // w1 region
        let d12_2 = -w1.dot(e12);
        if d12_2 <= 0.0 {
            // a2 <= 0, so we clamp it to 0
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // w2 region
        let d12_1 = w2.dot(e12);
        if d12_1 <= 0.0 {
            // a1 <= 0, so we clamp it to 0
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // Must be in e12 region.
        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    // Possible regions:
    // - points[2]
    // - edge points[0]-points[2]
    // - edge points[1]-points[2]
    // - inside the triangle
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        // Edge12
        // [1      1     ][a1] = [1]
        // [w1.e12 w2.e12][a2] = [0]
        // a3 = 0
        let e12 = w2 - w1;
        let d12_1 = w2.dot(e12);
        let d12_2 = -w1.dot(e12);

        // Edge13
        // [1      1     ][a1] = [1]
        // [w1.e13 w3.e13][a3] = [0]
        // a2 = 0
        let e13 = w3 - w1;
        let d13_1 = w3.dot(e13);
        let d13_2 = -w1.dot(e13);

        // Edge23
        // [1      1     ][a2] = [1]
        // [w2.e23 w3.e23][a3] = [0]
        // a1 = 0
        let e23 = w3 - w2;
        let d23_1 = w3.dot(e23);
        let d23_2 = -w2.dot(e23);

        // Triangle123
        let n123 = e12.cross(e13);

        let d123_1 = n123 * w2.cross(w3);
        let d123_2 = n123 * w3.cross(w1);
        let d123_3 = n123 * w1.cross(w2);

        // w1 region
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // e12
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv_d12 = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv_d12;
            self.v[1].a = d12_2 * inv_d12;
            self.count = 2;
            return;
        }

        // e13
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv_d13 = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv_d13;
            self.v[2].a = d13_2 * inv_d13;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // w2 region
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // w3 region
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[2].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[2];
            return;
        }

        // e23
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv_d23 = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv_d23;
            self.v[2].a = d23_2 * inv_d23;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // Must be in triangle123
        let inv_d123 = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv_d123;
        self.v[1].a = d123_2 * inv_d123;
        self.v[2].a = d123_3 * inv_d123;
        self.count = 3;
    }

    /// Reduce the simplex to the feature closest to the origin.
    fn solve(&mut self) {
        match self.count {
            1 => {}
            2 => self.solve2(),
            3 => self.solve3(),
            _ => debug_assert!(false, "invalid simplex count {}", self.count),
        }
    }
}

/// Compute the closest points between two shapes. Supports any combination of:
/// CircleShape, PolygonShape, EdgeShape. The simplex cache is input/output.
/// On the first call set `SimplexCache::count` to zero.
pub fn distance(
    cache: &mut SimplexCache,
    input: &DistanceInput,
    settings: &Settings,
) -> DistanceOutput {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;

    let transform_a = &input.transform_a;
    let transform_b = &input.transform_b;

    // Initialize the simplex.
    let mut simplex =
        Simplex::read_cache(cache, proxy_a, transform_a, proxy_b, transform_b, settings.epsilon);

    // These store the vertices of the last simplex so that we
    // can check for duplicates and prevent cycling.
    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    // Main iteration loop.
    let mut iter = 0;
    while iter < settings.max_gjk_iterations {
        // Copy simplex so we can identify duplicates.
        let save_count = simplex.count;
        for (i, v) in simplex.vertices().iter().enumerate() {
            save_a[i] = v.index_a;
            save_b[i] = v.index_b;
        }

        simplex.solve();

        // If we have 3 points, then the origin is in the corresponding triangle.
        if simplex.count == 3 {
            break;
        }

        // Get search direction.
        let d = simplex.get_search_direction();

        // Ensure the search direction is numerically fit.
        if d.length_squared() < settings.epsilon * settings.epsilon {
            // The origin is probably contained by a line segment
            // or triangle. Thus the shapes are overlapped.

            // We can't return zero here even though there may be overlap.
            // In case the simplex is a point, segment, or triangle it is difficult
            // to determine if the origin is contained in the CSO or very close to it.
            break;
        }

        // Compute a tentative new simplex vertex using support points.
        let index_a = proxy_a.get_support(transform_a.q.mul_t_vec2(-d));
        let index_b = proxy_b.get_support(transform_b.q.mul_t_vec2(d));
        let vertex =
            SimplexVertex::new(proxy_a, transform_a, index_a, proxy_b, transform_b, index_b);

        // Iteration count is equated to the number of support point calls.
        iter += 1;

        // Check for duplicate support points. This is the main termination criteria.
        let duplicate = (0..save_count)
            .any(|i| vertex.index_a == save_a[i] && vertex.index_b == save_b[i]);

        // If we found a duplicate support point we must exit to avoid cycling.
        if duplicate {
            break;
        }

        // New vertex is ok and needed.
        simplex.v[simplex.count] = vertex;
        simplex.count += 1;
    }

    if iter == settings.max_gjk_iterations {
        log::debug!("distance hit the iteration limit ({iter}) without converging");
    }

    // Prepare output.
    let (mut point_a, mut point_b) = simplex.get_witness_points();
    let mut distance = point_a.distance(point_b);

    // Cache the simplex.
    simplex.write_cache(cache);

    // Apply radii if requested.
    if input.use_radii {
        let r_a = proxy_a.radius;
        let r_b = proxy_b.radius;

        if distance > r_a + r_b && distance > settings.epsilon {
            // Shapes are still no overlapped.
            // Move the witness points to the outer surface.
            distance -= r_a + r_b;
            let normal = (point_b - point_a).normalize();
            point_a += r_a * normal;
            point_b -= r_b * normal;
        } else {
            // Shapes are overlapped when radii are considered.
            // Move the witness points to the middle.
            let p = 0.5 * (point_a + point_b);
            point_a = p;
            point_b = p;
            distance = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance,
        iterations: iter,
    }
}

/// Perform a linear shape cast of shape B moving and shape A fixed. Determines
/// the hit point, normal, and translation fraction. Returns `None` when the
/// shapes start out overlapped or no hit is found within the translation.
///
/// GJK-raycast
/// Algorithm by Gino van den Bergen.
/// "Smooth Mesh Contacts with GJK" in Game Physics Pearls. 2010
pub fn shape_cast(input: &ShapeCastInput, settings: &Settings) -> Option<ShapeCastOutput> {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;

    let radius_a = proxy_a.radius.max(settings.polygon_radius);
    let radius_b = proxy_b.radius.max(settings.polygon_radius);
    let radius = radius_a + radius_b;

    let xf_a = &input.transform_a;
    let xf_b = &input.transform_b;

    let r = input.translation_b;
    let mut n = Vec2::ZERO;
    let mut lambda = 0.0;

    // Initial simplex
    let mut simplex = Simplex::default();

    // Get support point in -r direction
    let mut index_a = proxy_a.get_support(xf_a.q.mul_t_vec2(-r));
    let mut w_a = xf_a.mul_vec2(proxy_a.vertex(index_a));
    let mut index_b = proxy_b.get_support(xf_b.q.mul_t_vec2(r));
    let mut w_b = xf_b.mul_vec2(proxy_b.vertex(index_b));
    let mut v = w_a - w_b;

    // Sigma is the target distance between polygons
    let sigma = settings.polygon_radius.max(radius - settings.polygon_radius);

    // Main iteration loop.
    let tolerance = 0.5 * settings.linear_slop;
    let mut iter = 0;
    while iter < settings.max_gjk_iterations && v.length() - sigma > tolerance {
        // Support in direction -v (A - B)
        index_a = proxy_a.get_support(xf_a.q.mul_t_vec2(-v));
        w_a = xf_a.mul_vec2(proxy_a.vertex(index_a));
        index_b = proxy_b.get_support(xf_b.q.mul_t_vec2(v));
        w_b = xf_b.mul_vec2(proxy_b.vertex(index_b));
        let p = w_a - w_b;

        // -v is a normal at p
        v = v.normalize();

        // Intersect ray with plane
        let vp = v.dot(p);
        let vr = v.dot(r);
        if vp - sigma > lambda * vr {
            if vr <= 0.0 {
                // miss
                return None;
            }

            lambda = (vp - sigma) / vr;
            if lambda > 1.0 {
                // miss
                return None;
            }

            n = -v;
            simplex.count = 0;
        }

        // Reverse simplex since it works with B - A.
        // Shift by lambda * r because we want the closest point to the current clip point.
        // Note that the support point p is not shifted because we want the plane equation
        // to be formed in unshifted space.
        let vertex = &mut simplex.v[simplex.count];
        vertex.index_a = index_b;
        vertex.w_a = w_b + lambda * r;
        vertex.index_b = index_a;
        vertex.w_b = w_a;
        vertex.w = vertex.w_b - vertex.w_a;
        vertex.a = 1.0;
        simplex.count += 1;

        simplex.solve();

        // If we have 3 points, then the origin is in the corresponding triangle.
        if simplex.count == 3 {
            // Overlap
            return None;
        }

        // Get search direction.
        v = simplex.get_closest_point();

        // Iteration count is equated to the number of support point calls.
        iter += 1;
    }

    if iter == 0 || lambda == 0.0 {
        // Initial overlap
        return None;
    }

    // Prepare output. The simplex holds B - A, so the second witness is on A.
    let (_, point_a) = simplex.get_witness_points();

    if v.length_squared() > 0.0 {
        n = (-v).normalize();
    }

    Some(ShapeCastOutput {
        point: point_a + radius_a * n,
        normal: n,
        lambda,
        iterations: iter,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::shape::{CircleShape, EdgeShape, PolygonShape};

    fn box_proxy(hx: f32, hy: f32) -> DistanceProxy {
        DistanceProxy::from_shape(&Shape::Polygon(PolygonShape::new_box(hx, hy)), 0)
    }

    fn input(
        proxy_a: DistanceProxy,
        xf_a: Transform,
        proxy_b: DistanceProxy,
        xf_b: Transform,
        use_radii: bool,
    ) -> DistanceInput {
        DistanceInput {
            proxy_a,
            proxy_b,
            transform_a: xf_a,
            transform_b: xf_b,
            use_radii,
        }
    }

    #[test]
    fn try_new_rejects_clouds_over_capacity() {
        let ring: Vec<Vec2> = (0..MAX_POLYGON_VERTICES + 1)
            .map(|i| Vec2::new(i as f32, (i * i) as f32))
            .collect();
        assert_eq!(
            DistanceProxy::try_new(&ring, 0.0),
            Err(ShapeError::TooManyVertices(MAX_POLYGON_VERTICES + 1))
        );
        assert_eq!(DistanceProxy::try_new(&[], 0.0), Err(ShapeError::TooFewVertices(0)));

        let proxy = DistanceProxy::try_new(&ring[..MAX_POLYGON_VERTICES], 0.5).unwrap();
        assert_eq!(proxy.count(), MAX_POLYGON_VERTICES);
        assert_eq!(proxy.vertex(proxy.get_support(Vec2::Y)), ring[MAX_POLYGON_VERTICES - 1]);
    }

    #[test]
    fn support_prefers_first_of_ties() {
        let proxy = box_proxy(1.0, 1.0);
        // Vertices are (-1,-1), (1,-1), (1,1), (-1,1); +x ties between 1 and 2.
        assert_eq!(proxy.get_support(Vec2::X), 1);
        assert_eq!(proxy.get_support(Vec2::new(-1.0, -1.0)), 0);
        assert_eq!(proxy.get_support_vertex(Vec2::Y), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn proxy_from_every_shape() {
        let circle = Shape::from(CircleShape::new(Vec2::new(1.0, 2.0), 0.5));
        let proxy = DistanceProxy::from_shape(&circle, 0);
        assert_eq!(proxy.count(), 1);
        assert_eq!(proxy.radius, 0.5);

        let edge = Shape::from(EdgeShape::new_two_sided(Vec2::ZERO, Vec2::X));
        assert_eq!(DistanceProxy::from_shape(&edge, 0).vertices(), &[Vec2::ZERO, Vec2::X]);

        let chain = Shape::from(
            crate::shape::ChainShape::new_loop(&[Vec2::ZERO, Vec2::X, Vec2::ONE]).unwrap(),
        );
        assert_eq!(DistanceProxy::from_shape(&chain, 2).vertices(), &[Vec2::ONE, Vec2::ZERO]);
    }

    #[test]
    fn boxes_side_by_side() {
        let settings = Settings::default();
        let proxy = box_proxy(1.0, 1.0);
        let xf_b = Transform::new(Vec2::new(3.0, 0.5), 0.0);
        let mut cache = SimplexCache::default();

        let query = input(proxy, Transform::IDENTITY, proxy, xf_b, false);

        let output = distance(&mut cache, &query, &settings);
        assert_relative_eq!(output.distance, 1.0, epsilon = 1e-5);
        assert_relative_eq!(output.point_a.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(output.point_b.x, 2.0, epsilon = 1e-5);
        assert!(output.iterations > 0);
        assert!(cache.count >= 1);
    }

    #[test]
    fn circles_touching_have_zero_distance() {
        let settings = Settings::default();
        let a = DistanceProxy::new(&[Vec2::ZERO], 1.0);
        let b = DistanceProxy::new(&[Vec2::ZERO], 0.5);
        let xf_b = Transform::new(Vec2::new(1.5, 0.0), 0.0);
        let mut cache = SimplexCache::default();

        let output = distance(&mut cache, &input(a, Transform::IDENTITY, b, xf_b, true), &settings);
        assert_relative_eq!(output.distance, 0.0, epsilon = 1e-5);
        assert_relative_eq!(output.point_a.x, output.point_b.x, epsilon = 1e-5);
    }

    #[test]
    fn radii_move_witness_points_to_surface() {
        let settings = Settings::default();
        let a = DistanceProxy::new(&[Vec2::ZERO], 1.0);
        let b = DistanceProxy::new(&[Vec2::ZERO], 0.5);
        let xf_b = Transform::new(Vec2::new(0.0, 4.0), 0.0);
        let mut cache = SimplexCache::default();

        let output = distance(&mut cache, &input(a, Transform::IDENTITY, b, xf_b, true), &settings);
        assert_relative_eq!(output.distance, 2.5, epsilon = 1e-5);
        assert_relative_eq!(output.point_a.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(output.point_b.y, 3.5, epsilon = 1e-5);
    }

    #[test]
    fn overlapping_boxes_report_zero() {
        let settings = Settings::default();
        let proxy = box_proxy(1.0, 1.0);
        let xf_b = Transform::new(Vec2::new(0.5, 0.25), 0.4);
        let mut cache = SimplexCache::default();

        let query = input(proxy, Transform::IDENTITY, proxy, xf_b, false);

        let output = distance(&mut cache, &query, &settings);
        assert!(output.distance < 1e-5);
    }

    #[test]
    fn warm_start_reuses_cache() {
        let settings = Settings::default();
        let proxy = box_proxy(1.0, 1.0);
        let xf_b = Transform::new(Vec2::new(3.0, 0.5), 0.1);
        let mut cache = SimplexCache::default();

        let query = input(proxy, Transform::IDENTITY, proxy, xf_b, false);
        let cold = distance(&mut cache, &query, &settings);
        let warm = distance(&mut cache, &query, &settings);
        assert_relative_eq!(cold.distance, warm.distance, epsilon = 1e-5);
        assert!(warm.iterations <= cold.iterations);
    }

    #[test]
    fn stale_cache_is_ignored() {
        let settings = Settings::default();
        let proxy = box_proxy(1.0, 1.0);
        let xf_b = Transform::new(Vec2::new(3.0, 0.0), 0.0);

        let mut garbage = SimplexCache {
            metric: 12.0,
            count: 3,
            index_a: [200, 7, 9],
            index_b: [1, 250, 3],
        };
        let query = input(proxy, Transform::IDENTITY, proxy, xf_b, false);
        let output = distance(&mut garbage, &query, &settings);
        assert_relative_eq!(output.distance, 1.0, epsilon = 1e-5);

        let mut oversized = SimplexCache {
            count: 9,
            ..SimplexCache::default()
        };
        let query = input(proxy, Transform::IDENTITY, proxy, xf_b, false);
        let output = distance(&mut oversized, &query, &settings);
        assert_relative_eq!(output.distance, 1.0, epsilon = 1e-5);
        assert!(oversized.count <= 3);
    }

    #[test]
    fn iteration_limit_is_respected() {
        let settings = Settings {
            max_gjk_iterations: 1,
            ..Settings::default()
        };
        let proxy = box_proxy(1.0, 1.0);
        let xf_b = Transform::new(Vec2::new(3.0, 2.0), 0.7);
        let mut cache = SimplexCache::default();
        let query = input(proxy, Transform::IDENTITY, proxy, xf_b, false);
        let output = distance(&mut cache, &query, &settings);
        assert!(output.iterations <= 1);
        assert!(output.distance >= 0.0);
    }

    #[test]
    fn shape_cast_hits_box() {
        let settings = Settings::default();
        let cast = ShapeCastInput {
            proxy_a: box_proxy(1.0, 1.0),
            proxy_b: DistanceProxy::new(&[Vec2::ZERO], 0.5),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::new(Vec2::new(-5.0, 0.0), 0.0),
            translation_b: Vec2::new(10.0, 0.0),
        };

        let output = shape_cast(&cast, &settings).expect("cast should hit");
        // Circle surface reaches the box skin after travelling ~3.5 units.
        assert_relative_eq!(output.lambda, 0.35, epsilon = 0.01);
        assert_relative_eq!(output.normal.x, -1.0, epsilon = 1e-3);
        assert!(output.iterations > 0);
    }

    #[test]
    fn shape_cast_misses_and_overlaps() {
        let settings = Settings::default();
        let mut cast = ShapeCastInput {
            proxy_a: box_proxy(1.0, 1.0),
            proxy_b: DistanceProxy::new(&[Vec2::ZERO], 0.5),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::new(Vec2::new(-5.0, 0.0), 0.0),
            translation_b: Vec2::new(2.0, 0.0),
        };
        // Too short to reach.
        assert!(shape_cast(&cast, &settings).is_none());

        // Moving away.
        cast.translation_b = Vec2::new(-10.0, 0.0);
        assert!(shape_cast(&cast, &settings).is_none());

        // Already overlapping.
        cast.transform_b = Transform::IDENTITY;
        cast.translation_b = Vec2::new(1.0, 0.0);
        assert!(shape_cast(&cast, &settings).is_none());
    }
}
