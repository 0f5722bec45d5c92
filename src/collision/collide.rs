use crate::{
    common::Transform,
    shape::{CircleShape, EdgeShape, PolygonShape, Shape},
};

use super::{
    collide_circles, collide_edge_and_circle, collide_edge_and_polygon,
    collide_polygon_and_circle, collide_polygons, Manifold,
};

/// A single convex piece of a shape. Chains are resolved to their child edge.
enum Child<'a> {
    Circle(&'a CircleShape),
    Polygon(&'a PolygonShape),
    Edge(EdgeShape),
}

impl<'a> Child<'a> {
    fn resolve(shape: &'a Shape, index: usize) -> Self {
        match shape {
            Shape::Circle(circle) => Child::Circle(circle),
            Shape::Polygon(polygon) => Child::Polygon(polygon),
            Shape::Edge(edge) => Child::Edge(*edge),
            Shape::Chain(chain) => Child::Edge(chain.child_edge(index)),
        }
    }
}

/// Run a collider with the operands exchanged and hand the result back in
/// the caller's A/B order.
fn reversed(mut manifold: Manifold) -> Manifold {
    manifold.swap_roles();
    manifold
}

/// Compute the contact manifold for any pair of shape children. `index_a` and
/// `index_b` select the child edge of a chain and are ignored otherwise.
/// Pairs of edges have no area to collide and always yield an empty manifold.
pub fn collide(
    shape_a: &Shape,
    index_a: usize,
    xf_a: &Transform,
    shape_b: &Shape,
    index_b: usize,
    xf_b: &Transform,
) -> Manifold {
    match (Child::resolve(shape_a, index_a), Child::resolve(shape_b, index_b)) {
        (Child::Circle(a), Child::Circle(b)) => collide_circles(a, xf_a, b, xf_b),
        (Child::Polygon(a), Child::Circle(b)) => collide_polygon_and_circle(a, xf_a, b, xf_b),
        (Child::Circle(a), Child::Polygon(b)) => {
            reversed(collide_polygon_and_circle(b, xf_b, a, xf_a))
        }
        (Child::Polygon(a), Child::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),
        (Child::Edge(a), Child::Circle(b)) => collide_edge_and_circle(&a, xf_a, b, xf_b),
        (Child::Circle(a), Child::Edge(b)) => reversed(collide_edge_and_circle(&b, xf_b, a, xf_a)),
        (Child::Edge(a), Child::Polygon(b)) => collide_edge_and_polygon(&a, xf_a, b, xf_b),
        (Child::Polygon(a), Child::Edge(b)) => {
            reversed(collide_edge_and_polygon(&b, xf_b, a, xf_a))
        }
        (Child::Edge(_), Child::Edge(_)) => Manifold::default(),
    }
}
