use std::rc::Rc;

use cgmath::{Vector2, Vector3};

use crate::gl_api::buffer::VertexBuffer;
use crate::gl_api::context::{GraphicsContext, Primitive, UsageType};
use crate::gl_api::error::GlResult;
use crate::gl_api::layout::VertexLayout;
use crate::gl_api::shader::program::Program;
use crate::gl_api::vertex_array::VertexArray;

vertex! {
    /// Interleaved clip-space position and RGB color.
    vertex ColorVertex {
        vertex_position: [f32; 2],
        vertex_color: [f32; 3],
    }
}

/// Corners of an isosceles triangle centered on `center`: top left, top
/// right, then bottom middle. `colors` are assigned to the corners in that
/// order.
pub fn triangle_vertices(
    center: Vector2<f32>,
    size: Vector2<f32>,
    colors: [Vector3<f32>; 3],
) -> [ColorVertex; 3] {
    let half = size / 2.0;
    let corner = |x: f32, y: f32, color: Vector3<f32>| ColorVertex {
        vertex_position: [x, y],
        vertex_color: color.into(),
    };
    [
        corner(center.x - half.x, center.y + half.y, colors[0]),
        corner(center.x + half.x, center.y + half.y, colors[1]),
        corner(center.x, center.y - half.y, colors[2]),
    ]
}

/// One colored triangle with its own vertex buffer and vertex array. The
/// graphics context and the program are shared with the rest of the scene.
#[derive(Debug)]
pub struct Triangle<'gl, C: GraphicsContext> {
    ctx: &'gl C,
    vertex_array: VertexArray<'gl, C>,
    buffer: VertexBuffer<'gl, C, ColorVertex>,
    program: Rc<Program<'gl, C>>,
    vertices: [ColorVertex; 3],
}

impl<'gl, C: GraphicsContext> Triangle<'gl, C> {
    /// A triangle with `color` at every corner.
    pub fn new(
        ctx: &'gl C,
        program: Rc<Program<'gl, C>>,
        position: Vector2<f32>,
        size: Vector2<f32>,
        color: Vector3<f32>,
    ) -> GlResult<Self> {
        Self::with_vertex_colors(ctx, program, position, size, [color; 3])
    }

    /// A triangle whose corner colors are blended across its face. See
    /// [`triangle_vertices`] for the corner order.
    pub fn with_vertex_colors(
        ctx: &'gl C,
        program: Rc<Program<'gl, C>>,
        position: Vector2<f32>,
        size: Vector2<f32>,
        colors: [Vector3<f32>; 3],
    ) -> GlResult<Self> {
        let vertices = triangle_vertices(position, size, colors);

        let mut vertex_array = VertexArray::new(ctx)?;
        let mut buffer = VertexBuffer::new(ctx)?;
        vertex_array.bind();
        buffer.upload(&vertices, UsageType::StaticDraw)?;
        let bound = vertex_array.add_buffer(&buffer, &program);
        if bound < ColorVertex::ATTRIBUTES.len() {
            log::warn!(
                "triangle at ({}, {}) bound {} of {} vertex attributes",
                position.x,
                position.y,
                bound,
                ColorVertex::ATTRIBUTES.len()
            );
        }
        ctx.bind_vertex_array(None);

        log::debug!(
            "created triangle at ({}, {}) size ({}, {})",
            position.x,
            position.y,
            size.x,
            size.y
        );
        Ok(Triangle { ctx, vertex_array, buffer, program, vertices })
    }

    /// Issues one draw of this triangle's three vertices with the shared
    /// program. Uses whatever viewport and framebuffer are current.
    pub fn draw(&self) {
        self.program.bind();
        self.vertex_array.bind();
        self.ctx.draw_arrays(Primitive::Triangles, 0, self.vertices.len() as i32);
    }

    /// The vertices uploaded at construction.
    pub fn vertices(&self) -> &[ColorVertex; 3] {
        &self.vertices
    }

    /// The vertex data as currently stored on the GPU.
    pub fn read_back(&self) -> GlResult<Vec<ColorVertex>> {
        self.buffer.read_back()
    }

    pub fn program(&self) -> &Rc<Program<'gl, C>> {
        &self.program
    }
}
