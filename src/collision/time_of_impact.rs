use crate::{
    common::{Sweep, Transform, Vec2, Vec2Ext},
    settings::Settings,
};

use super::{distance, DistanceInput, DistanceProxy, SimplexCache};

/// Input parameters for `time_of_impact`
#[derive(Debug, Clone, Copy)]
pub struct ToiInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub sweep_a: Sweep,
    pub sweep_b: Sweep,
    /// defines sweep interval [0, t_max]
    pub t_max: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ToiState {
    #[default]
    Unknown,
    Failed,
    Overlapped,
    Touching,
    Separated,
}

/// Output parameters for `time_of_impact`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToiOutput {
    pub state: ToiState,
    pub t: f32,
    /// Outer conservative advancement steps taken.
    pub iterations: usize,
    /// Root finder steps taken across all outer steps.
    pub root_iterations: usize,
}

/// Caller-owned accumulator for time of impact diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToiStats {
    pub calls: usize,
    pub iterations: usize,
    pub max_iterations: usize,
    pub root_iterations: usize,
    pub max_root_iterations: usize,
    pub failures: usize,
}

impl ToiStats {
    pub fn record(&mut self, output: &ToiOutput) {
        self.calls += 1;
        self.iterations += output.iterations;
        self.max_iterations = self.max_iterations.max(output.iterations);
        self.root_iterations += output.root_iterations;
        self.max_root_iterations = self.max_root_iterations.max(output.root_iterations);
        if output.state == ToiState::Failed {
            self.failures += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeparationType {
    Points,
    FaceA,
    FaceB,
}

/// Separating axis between two swept proxies, built from a GJK simplex.
/// For the face types the axis is stored in the local frame of the face
/// owner and `local_point` is the face center.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeparationFunction<'a> {
    proxy_a: &'a DistanceProxy,
    proxy_b: &'a DistanceProxy,
    sweep_a: Sweep,
    sweep_b: Sweep,
    separation_type: SeparationType,
    local_point: Vec2,
    axis: Vec2,
}

impl<'a> SeparationFunction<'a> {
    /// Build the separating axis from the cache at time `t1`. Returns the
    /// function along with the initial separation.
    pub(crate) fn new(
        cache: &SimplexCache,
        proxy_a: &'a DistanceProxy,
        sweep_a: &Sweep,
        proxy_b: &'a DistanceProxy,
        sweep_b: &Sweep,
        t1: f32,
    ) -> (Self, f32) {
        let count = cache.count as usize;
        debug_assert!(0 < count && count < 3);

        let xf_a = sweep_a.get_transform(t1);
        let xf_b = sweep_b.get_transform(t1);

        let mut fcn = Self {
            proxy_a,
            proxy_b,
            sweep_a: *sweep_a,
            sweep_b: *sweep_b,
            separation_type: SeparationType::Points,
            local_point: Vec2::ZERO,
            axis: Vec2::ZERO,
        };

        if count == 1 {
            let local_point_a = proxy_a.vertex(cache.index_a[0] as usize);
            let local_point_b = proxy_b.vertex(cache.index_b[0] as usize);
            let point_a = xf_a.mul_vec2(local_point_a);
            let point_b = xf_b.mul_vec2(local_point_b);
            fcn.axis = point_b - point_a;
            let s = fcn.axis.normalize_len();
            return (fcn, s);
        }

        if cache.index_a[0] == cache.index_a[1] {
            // Two points on B and one on A.
            fcn.separation_type = SeparationType::FaceB;
            let local_point_b1 = proxy_b.vertex(cache.index_b[0] as usize);
            let local_point_b2 = proxy_b.vertex(cache.index_b[1] as usize);

            fcn.axis = (local_point_b2 - local_point_b1).cross_scalar(1.0);
            fcn.axis.normalize_len();
            let normal = xf_b.q * fcn.axis;

            fcn.local_point = 0.5 * (local_point_b1 + local_point_b2);
            let point_b = xf_b.mul_vec2(fcn.local_point);

            let local_point_a = proxy_a.vertex(cache.index_a[0] as usize);
            let point_a = xf_a.mul_vec2(local_point_a);

            let mut s = (point_a - point_b).dot(normal);
            if s < 0.0 {
                fcn.axis = -fcn.axis;
                s = -s;
            }
            (fcn, s)
        } else {
            // Two points on A and one or two points on B.
            fcn.separation_type = SeparationType::FaceA;
            let local_point_a1 = proxy_a.vertex(cache.index_a[0] as usize);
            let local_point_a2 = proxy_a.vertex(cache.index_a[1] as usize);

            fcn.axis = (local_point_a2 - local_point_a1).cross_scalar(1.0);
            fcn.axis.normalize_len();
            let normal = xf_a.q * fcn.axis;

            fcn.local_point = 0.5 * (local_point_a1 + local_point_a2);
            let point_a = xf_a.mul_vec2(fcn.local_point);

            let local_point_b = proxy_b.vertex(cache.index_b[0] as usize);
            let point_b = xf_b.mul_vec2(local_point_b);

            let mut s = (point_b - point_a).dot(normal);
            if s < 0.0 {
                fcn.axis = -fcn.axis;
                s = -s;
            }
            (fcn, s)
        }
    }

    fn transforms(&self, t: f32) -> (Transform, Transform) {
        (self.sweep_a.get_transform(t), self.sweep_b.get_transform(t))
    }

    /// Find the deepest points at time `t`. Returns the separation with the
    /// support indices on A and B. The index on the face owner is unused.
    pub(crate) fn find_min_separation(&self, t: f32) -> (f32, usize, usize) {
        let (xf_a, xf_b) = self.transforms(t);

        match self.separation_type {
            SeparationType::Points => {
                let axis_a = xf_a.q.mul_t_vec2(self.axis);
                let axis_b = xf_b.q.mul_t_vec2(-self.axis);

                let index_a = self.proxy_a.get_support(axis_a);
                let index_b = self.proxy_b.get_support(axis_b);

                let point_a = xf_a.mul_vec2(self.proxy_a.vertex(index_a));
                let point_b = xf_b.mul_vec2(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(self.axis), index_a, index_b)
            }
            SeparationType::FaceA => {
                let normal = xf_a.q * self.axis;
                let point_a = xf_a.mul_vec2(self.local_point);

                let axis_b = xf_b.q.mul_t_vec2(-normal);
                let index_b = self.proxy_b.get_support(axis_b);
                let point_b = xf_b.mul_vec2(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(normal), 0, index_b)
            }
            SeparationType::FaceB => {
                let normal = xf_b.q * self.axis;
                let point_b = xf_b.mul_vec2(self.local_point);

                let axis_a = xf_a.q.mul_t_vec2(-normal);
                let index_a = self.proxy_a.get_support(axis_a);
                let point_a = xf_a.mul_vec2(self.proxy_a.vertex(index_a));

                ((point_a - point_b).dot(normal), index_a, 0)
            }
        }
    }

    /// Evaluate the separation of the given support points at time `t`.
    pub(crate) fn evaluate(&self, index_a: usize, index_b: usize, t: f32) -> f32 {
        let (xf_a, xf_b) = self.transforms(t);

        match self.separation_type {
            SeparationType::Points => {
                let point_a = xf_a.mul_vec2(self.proxy_a.vertex(index_a));
                let point_b = xf_b.mul_vec2(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(self.axis)
            }
            SeparationType::FaceA => {
                let normal = xf_a.q * self.axis;
                let point_a = xf_a.mul_vec2(self.local_point);
                let point_b = xf_b.mul_vec2(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(normal)
            }
            SeparationType::FaceB => {
                let normal = xf_b.q * self.axis;
                let point_b = xf_b.mul_vec2(self.local_point);
                let point_a = xf_a.mul_vec2(self.proxy_a.vertex(index_a));
                (point_a - point_b).dot(normal)
            }
        }
    }
}

/// Compute the upper bound on time before two shapes penetrate. Time is represented as
/// a fraction between [0,t_max]. This uses a swept separating axis and may miss some intermediate,
/// non-tunneling collisions. If you change the time interval, you should call this function
/// again.
///
/// CCD via the local separating axis method. This seeks progression
/// by computing the largest time at which separation is maintained.
pub fn time_of_impact(input: &ToiInput, settings: &Settings) -> ToiOutput {
    let mut output = ToiOutput {
        state: ToiState::Unknown,
        t: input.t_max,
        iterations: 0,
        root_iterations: 0,
    };

    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;

    let mut sweep_a = input.sweep_a;
    let mut sweep_b = input.sweep_b;

    // Large rotations can make the root finder fail, so we normalize the
    // sweep angles.
    sweep_a.normalize();
    sweep_b.normalize();

    let t_max = input.t_max;

    let total_radius = proxy_a.radius + proxy_b.radius;
    let target = settings.linear_slop.max(total_radius - 3.0 * settings.linear_slop);
    let tolerance = 0.25 * settings.linear_slop;
    debug_assert!(target > tolerance);

    let mut t1 = 0.0;
    let mut iter = 0;

    // Prepare input for distance query.
    let mut cache = SimplexCache::default();
    let mut distance_input = DistanceInput {
        proxy_a: input.proxy_a,
        proxy_b: input.proxy_b,
        transform_a: Transform::IDENTITY,
        transform_b: Transform::IDENTITY,
        use_radii: false,
    };

    // The outer loop progressively attempts to compute new separating axes.
    // This loop terminates when an axis is repeated (no progress is made).
    loop {
        distance_input.transform_a = sweep_a.get_transform(t1);
        distance_input.transform_b = sweep_b.get_transform(t1);

        // Get the distance between shapes. We can also use the results
        // to get a separating axis.
        let distance_output = distance(&mut cache, &distance_input, settings);

        // If the shapes are overlapped, we give up on continuous collision.
        if distance_output.distance <= 0.0 {
            output.state = ToiState::Overlapped;
            output.t = 0.0;
            break;
        }

        if distance_output.distance < target + tolerance {
            // Victory!
            output.state = ToiState::Touching;
            output.t = t1;
            break;
        }

        // Initialize the separating axis.
        let (fcn, _) = SeparationFunction::new(&cache, proxy_a, &sweep_a, proxy_b, &sweep_b, t1);

        // Compute the TOI on the separating axis. We do this by successively
        // resolving the deepest point. This loop is bounded by the number of vertices.
        let mut done = false;
        let mut t2 = t_max;
        let mut push_back_iter = 0;
        loop {
            // Find the deepest point at t2. Store the witness point indices.
            let (mut s2, index_a, index_b) = fcn.find_min_separation(t2);

            // Is the final configuration separated?
            if s2 > target + tolerance {
                // Victory!
                output.state = ToiState::Separated;
                output.t = t_max;
                done = true;
                break;
            }

            // Has the separation reached tolerance?
            if s2 > target - tolerance {
                // Advance the sweeps
                t1 = t2;
                break;
            }

            // Compute the initial separation of the witness points.
            let mut s1 = fcn.evaluate(index_a, index_b, t1);

            // Check for initial overlap. This might happen if the root finder
            // runs out of iterations.
            if s1 < target - tolerance {
                output.state = ToiState::Failed;
                output.t = t1;
                done = true;
                break;
            }

            // Check for touching
            if s1 <= target + tolerance {
                // Victory! t1 should hold the TOI (could be 0.0).
                output.state = ToiState::Touching;
                output.t = t1;
                done = true;
                break;
            }

            // Compute 1D root of: f(x) - target = 0
            let mut root_iter_count = 0;
            let mut a1 = t1;
            let mut a2 = t2;
            loop {
                // Use a mix of the secant rule and bisection.
                let t = if root_iter_count & 1 == 1 {
                    // Secant rule to improve convergence.
                    a1 + (target - s1) * (a2 - a1) / (s2 - s1)
                } else {
                    // Bisection to guarantee progress.
                    0.5 * (a1 + a2)
                };

                root_iter_count += 1;
                output.root_iterations += 1;

                let s = fcn.evaluate(index_a, index_b, t);

                if (s - target).abs() < tolerance {
                    // t2 holds a tentative value for t1
                    t2 = t;
                    break;
                }

                // Ensure we continue to bracket the root.
                if s > target {
                    a1 = t;
                    s1 = s;
                } else {
                    a2 = t;
                    s2 = s;
                }

                log::trace!("toi root bracket [{a1}, {a2}] separation {s}");

                if root_iter_count >= settings.max_toi_root_iterations {
                    break;
                }
            }

            push_back_iter += 1;

            if push_back_iter >= settings.max_polygon_vertices {
                break;
            }
        }

        iter += 1;
        output.iterations = iter;

        if done {
            break;
        }

        if iter >= settings.max_toi_iterations {
            // Root finder got stuck. Semi-victory.
            output.state = ToiState::Failed;
            output.t = t1;
            break;
        }
    }

    if output.state == ToiState::Failed {
        log::debug!(
            "time of impact failed at t = {} after {} iterations ({} root iterations)",
            output.t,
            output.iterations,
            output.root_iterations
        );
    }

    output
}
