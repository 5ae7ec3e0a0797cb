use std::marker::PhantomData;
use std::mem;

use bytemuck::Pod;

use super::context::{BufferId, GraphicsContext, UsageType};
use super::error::{GlError, GlResult};

/// A GPU array buffer holding elements of type `T`.
///
/// The buffer is deleted when this value is dropped.
#[derive(Debug)]
pub struct VertexBuffer<'gl, C: GraphicsContext, T> {
    ctx: &'gl C,
    id: BufferId,
    length: usize,
    _phantom: PhantomData<*mut T>,
}

impl<'gl, C: GraphicsContext, T: Pod> VertexBuffer<'gl, C, T> {
    pub fn new(ctx: &'gl C) -> GlResult<Self> {
        let id = ctx.create_buffer()?;
        log::trace!("created buffer {}", id.raw());
        Ok(VertexBuffer { ctx, id, length: 0, _phantom: PhantomData })
    }

    pub fn bind(&self) {
        self.ctx.bind_array_buffer(Some(self.id));
    }

    /// Copies data from `data` to the gpu's memory
    pub fn upload(&mut self, data: &[T], usage_type: UsageType) -> GlResult<()> {
        self.bind();
        self.ctx.buffer_data(bytemuck::cast_slice(data), usage_type)?;
        self.length = data.len();
        Ok(())
    }

    /// Reads the buffer contents back from the GPU.
    pub fn read_back(&self) -> GlResult<Vec<T>> {
        let bytes = self.ctx.read_buffer(self.id)?;
        let size = mem::size_of::<T>();
        if size == 0 || bytes.len() % size != 0 {
            return Err(GlError::INVALID_VALUE);
        }
        Ok(bytes.chunks_exact(size).map(bytemuck::pod_read_unaligned).collect())
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl<'gl, C: GraphicsContext, T> Drop for VertexBuffer<'gl, C, T> {
    fn drop(&mut self) {
        log::trace!("deleting buffer {}", self.id.raw());
        self.ctx.delete_buffer(self.id);
    }
}
