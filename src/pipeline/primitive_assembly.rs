/// How a sequence of vertices is assembled into primitives.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Topology {
    Point,
    Line,
    Triangle,
    LineStrip,
    LineLoop,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    /// The number of complete primitives `vertex_count` vertices assemble into.
    ///
    /// Trailing vertices that do not complete a primitive are ignored, as the host does.
    pub fn primitive_count(&self, vertex_count: u32) -> u32 {
        match self {
            Topology::Point => vertex_count,
            Topology::Line => vertex_count / 2,
            Topology::Triangle => vertex_count / 3,
            Topology::LineStrip => vertex_count.saturating_sub(1),
            Topology::LineLoop => {
                if vertex_count < 2 {
                    0
                } else {
                    vertex_count
                }
            }
            Topology::TriangleStrip | Topology::TriangleFan => vertex_count.saturating_sub(2),
        }
    }
}
