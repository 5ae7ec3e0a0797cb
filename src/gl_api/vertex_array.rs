use super::buffer::VertexBuffer;
use super::context::{GraphicsContext, VertexArrayId};
use super::error::GlResult;
use super::layout::VertexLayout;
use super::shader::program::Program;

#[derive(Debug)]
pub struct VertexArray<'gl, C: GraphicsContext> {
    ctx: &'gl C,
    id: VertexArrayId,
}

impl<'gl, C: GraphicsContext> VertexArray<'gl, C> {
    pub fn new(ctx: &'gl C) -> GlResult<Self> {
        let id = ctx.create_vertex_array()?;
        log::trace!("created vertex array {}", id.raw());
        Ok(VertexArray { ctx, id })
    }

    pub fn bind(&self) {
        self.ctx.bind_vertex_array(Some(self.id));
    }

    /// Sources every attribute of `T` from `buffer`, matching layout fields
    /// to the program's vertex inputs by name. Returns how many attributes
    /// were bound.
    ///
    /// A field the program has no active input for is skipped with a
    /// warning. The compiler is free to drop unused inputs, so this is not
    /// an error.
    pub fn add_buffer<T: VertexLayout>(
        &mut self,
        buffer: &VertexBuffer<'gl, C, T>,
        program: &Program<'gl, C>,
    ) -> usize {
        self.bind();
        buffer.bind();

        let stride = T::stride() as i32;
        let mut bound = 0;
        for attribute in T::ATTRIBUTES {
            let location = match program.attrib_location(attribute.name) {
                Some(location) => location,
                None => {
                    log::warn!(
                        "program {} has no active attribute `{}`; leaving it unbound",
                        program.id().raw(),
                        attribute.name
                    );
                    continue;
                }
            };
            self.ctx.enable_vertex_attrib_array(location);
            self.ctx.vertex_attrib_pointer_f32(
                location,
                attribute.components,
                stride,
                attribute.offset as i32,
            );
            bound += 1;
        }
        bound
    }
}

impl<'gl, C: GraphicsContext> Drop for VertexArray<'gl, C> {
    fn drop(&mut self) {
        log::trace!("deleting vertex array {}", self.id.raw());
        self.ctx.delete_vertex_array(self.id);
    }
}
