pub mod collision;
pub mod common;
pub mod decomposition;
pub mod settings;
pub mod shape;

pub use collision::{
    collide, distance, get_point_states, shape_cast, test_overlap, time_of_impact, Aabb,
    DistanceInput, DistanceOutput, DistanceProxy, Manifold, ManifoldType, ShapeCastInput,
    ShapeCastOutput, SimplexCache, ToiInput, ToiOutput, ToiState, ToiStats, WorldManifold,
};
pub use common::{Rot, Sweep, Transform, Vec2};
pub use decomposition::{convex_partition, PartitionError};
pub use settings::Settings;
pub use shape::{ChainShape, CircleShape, EdgeShape, PolygonShape, Shape, ShapeError};
