//! Triangulated visibility fan.

use glam::{Vec2, Vec3};
use nightwatch_core::{MeshSink, RotationSense};

/// Visibility fan expressed relative to the agent that produced it.
///
/// Vertex 0 is the apex at the agent's position; the remaining vertices are
/// the sampled and refined boundary points in sweep order. Triangles fan out
/// from the apex and always wind counter-clockwise: `(0, i, i + 1)` when the
/// sweep turns counter-clockwise, `(0, i + 1, i)` when it turns clockwise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibilityPolygon {
    origin: Vec2,
    vertices: Vec<Vec2>,
    triangles: Vec<[u32; 3]>,
}

impl VisibilityPolygon {
    /// Creates an empty polygon.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// World-space position the polygon was built from.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Local-space vertices, apex first.
    #[must_use]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Fan triangles indexing into [`VisibilityPolygon::vertices`].
    #[must_use]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Reports whether the polygon holds no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Reports whether a world-space point lies inside any fan triangle.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let local = point - self.origin;
        self.triangles.iter().any(|triangle| {
            let [a, b, c] = triangle.map(|index| self.vertices[index as usize]);
            triangle_contains(a, b, c, local)
        })
    }

    /// Pushes the polygon into a mesh sink, replacing its previous contents.
    ///
    /// Triangles reach the sink counter-clockwise whatever the rotation sense.
    pub fn write_to(&self, sink: &mut dyn MeshSink) {
        let vertices: Vec<Vec3> = self.vertices.iter().map(|vertex| vertex.extend(0.0)).collect();
        sink.replace(&vertices, &self.triangles);
    }

    pub(crate) fn clear(&mut self, origin: Vec2) {
        self.origin = origin;
        self.vertices.clear();
        self.triangles.clear();
    }

    /// Rebuilds the fan from world-space boundary points swept in `sense`.
    pub(crate) fn rebuild(&mut self, origin: Vec2, boundary: &[Vec2], sense: RotationSense) {
        self.clear(origin);
        if boundary.len() < 2 {
            return;
        }

        self.vertices.reserve(boundary.len() + 1);
        self.vertices.push(Vec2::ZERO);
        self.vertices
            .extend(boundary.iter().map(|point| *point - origin));

        let vertex_count = self.vertices.len() as u32;
        self.triangles
            .extend((1..vertex_count - 1).map(|index| match sense {
                RotationSense::CounterClockwise => [0, index, index + 1],
                RotationSense::Clockwise => [0, index + 1, index],
            }));
    }
}

fn triangle_contains(a: Vec2, b: Vec2, c: Vec2, point: Vec2) -> bool {
    let d1 = (point - b).perp_dot(a - b);
    let d2 = (point - c).perp_dot(b - c);
    let d3 = (point - a).perp_dot(c - a);
    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_negative && has_positive)
}
