//! Global tuning constants based on meters-kilograms-seconds (MKS) units,
//! and the [`Settings`] value that carries them into the collision routines.

/// You can use this to change the length scale used by your game.
/// For example for inches you could use 39.4.
pub const LENGTH_UNITS_PER_METER: f32 = 1.0;

/// The maximum number of contact points between two convex shapes. Do
/// not change this value.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// The maximum number of vertices on a convex polygon. This sizes the
/// polygon and distance proxy storage.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// A small length used as a collision and constraint tolerance. Usually it is
/// chosen to be numerically significant, but visually insignificant. In meters.
pub const LINEAR_SLOP: f32 = 0.005 * LENGTH_UNITS_PER_METER;

/// The radius of the polygon/edge shape skin. This should not be modified. Making
/// this smaller means polygons will have an insufficient buffer for continuous collision.
/// Making it larger may create artifacts for vertex collision.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Maximum number of GJK iterations.
pub const MAX_GJK_ITERATIONS: usize = 20;

/// Maximum number of conservative advancement iterations in the time of
/// impact solver.
pub const MAX_TOI_ITERATIONS: usize = 20;

/// Maximum number of root finder iterations per time of impact bracket.
pub const MAX_TOI_ROOT_ITERATIONS: usize = 50;

/// Smallest meaningful float difference used by the geometric predicates.
pub const EPSILON: f32 = f32::EPSILON;

/// Tunables consumed read-only by the distance, time of impact and
/// decomposition routines.
///
/// `Settings::default()` matches the constants above. Tests and callers can
/// tighten individual limits (for instance a tiny `max_polygon_vertices`) to
/// exercise edge cases without touching the algorithms.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    pub length_units_per_meter: f32,
    pub linear_slop: f32,
    pub polygon_radius: f32,
    /// Maximum vertex count of a decomposed polygon. Also bounds the number
    /// of push back iterations in the time of impact solver.
    pub max_polygon_vertices: usize,
    pub max_gjk_iterations: usize,
    pub max_toi_iterations: usize,
    pub max_toi_root_iterations: usize,
    pub epsilon: f32,
}

impl Settings {
    /// Settings for a world measured in `units` length units per meter. All
    /// length tolerances scale with it.
    pub fn for_length_units(units: f32) -> Self {
        debug_assert!(units > 0.0);
        let linear_slop = 0.005 * units;
        Self {
            length_units_per_meter: units,
            linear_slop,
            polygon_radius: 2.0 * linear_slop,
            ..Self::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            length_units_per_meter: LENGTH_UNITS_PER_METER,
            linear_slop: LINEAR_SLOP,
            polygon_radius: POLYGON_RADIUS,
            max_polygon_vertices: MAX_POLYGON_VERTICES,
            max_gjk_iterations: MAX_GJK_ITERATIONS,
            max_toi_iterations: MAX_TOI_ITERATIONS,
            max_toi_root_iterations: MAX_TOI_ROOT_ITERATIONS,
            epsilon: EPSILON,
        }
    }
}
