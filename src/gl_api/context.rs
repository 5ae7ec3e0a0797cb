//! The capability interface every drawable and pipeline talks to.
//!
//! Only the handful of GL operations the renderer actually issues are exposed
//! here. [`NativeContext`](super::native::NativeContext) forwards them to the
//! loaded driver; [`HeadlessContext`](super::headless::HeadlessContext)
//! implements them in software.

use std::fmt;
use std::num::NonZeroU32;

use super::error::GlResult;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wraps a raw GL object name. Zero is never a valid object.
            pub fn from_raw(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map($name)
            }

            pub fn raw(self) -> u32 {
                self.0.get()
            }
        }
    };
}

handle!(
    /// A shader stage object.
    ShaderId
);
handle!(
    /// A program object.
    ProgramId
);
handle!(
    /// A buffer object.
    BufferId
);
handle!(
    /// A vertex array object.
    VertexArrayId
);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShaderType {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShaderType::Vertex => write!(f, "vertex"),
            ShaderType::Fragment => write!(f, "fragment"),
        }
    }
}

/// Usage type for buffers, provided as a performance hint. These values do not affect the behavior
/// of the buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum UsageType {
    /// The data store contents will be specified once by the application, and sourced at most a few times.
    StreamDraw = gl::STREAM_DRAW,
    /// The data store contents will be specified once by the application, and sourced many times.
    StaticDraw = gl::STATIC_DRAW,
    /// The data store contents will be respecified repeatedly by the application, and sourced many times.
    DynamicDraw = gl::DYNAMIC_DRAW,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum Primitive {
    Points = gl::POINTS,
    Lines = gl::LINES,
    Triangles = gl::TRIANGLES,
    TriangleStrip = gl::TRIANGLE_STRIP,
}

/// The graphics operations used by the renderer.
///
/// Methods mirror the GL entry points of the same name. Buffer operations
/// act on the `ARRAY_BUFFER` binding and attribute operations on the
/// currently bound vertex array, exactly as in GL.
pub trait GraphicsContext {
    fn create_shader(&self, ty: ShaderType) -> GlResult<ShaderId>;
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&self, shader: ShaderId);

    fn create_program(&self) -> GlResult<ProgramId>;
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);
    /// Location of the named vertex input, or `None` when the linked program
    /// has no active attribute by that name.
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    fn create_buffer(&self) -> GlResult<BufferId>;
    fn bind_array_buffer(&self, buffer: Option<BufferId>);
    /// Replaces the data store of the bound array buffer.
    fn buffer_data(&self, data: &[u8], usage: UsageType) -> GlResult<()>;
    /// Copies the full data store of `buffer` back to the host.
    fn read_buffer(&self, buffer: BufferId) -> GlResult<Vec<u8>>;
    fn delete_buffer(&self, buffer: BufferId);

    fn create_vertex_array(&self) -> GlResult<VertexArrayId>;
    fn bind_vertex_array(&self, vao: Option<VertexArrayId>);
    fn delete_vertex_array(&self, vao: VertexArrayId);
    fn enable_vertex_attrib_array(&self, location: u32);
    /// Sources float attribute `location` from the bound array buffer.
    /// `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer_f32(&self, location: u32, components: i32, stride: i32, offset: i32);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    /// Clears the color buffer.
    fn clear(&self);
    fn draw_arrays(&self, mode: Primitive, first: i32, count: i32);
}
