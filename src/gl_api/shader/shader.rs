use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::gl_api::context::{GraphicsContext, ShaderId};
pub use crate::gl_api::context::ShaderType;
use crate::gl_api::error::GlError;

pub type ShaderResult<T> = Result<T, ShaderError>;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("could not create {0} shader: {1}")]
    Creation(ShaderType, #[source] GlError),
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderType, log: String },
}

/// A shader stage that has not been compiled yet.
#[derive(Debug)]
pub struct Shader<'gl, C: GraphicsContext> {
    ctx: &'gl C,
    id: ShaderId,
    shader_type: ShaderType,
}

impl<'gl, C: GraphicsContext> Shader<'gl, C> {
    pub fn new(ctx: &'gl C, shader_type: ShaderType) -> ShaderResult<Self> {
        let id = ctx
            .create_shader(shader_type)
            .map_err(|err| ShaderError::Creation(shader_type, err))?;
        log::trace!("created {} shader {}", shader_type, id.raw());
        Ok(Shader { ctx, id, shader_type })
    }

    pub fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    pub fn source(&self, source: &str) {
        self.ctx.shader_source(self.id, source);
    }

    pub fn source_from_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let text = fs::read_to_string(path)?;
        self.source(&text);
        Ok(())
    }

    /// Compiles the stage. On failure the driver's log is reported at
    /// `error` level, the stage object is released, and the log is returned.
    pub fn compile(self) -> ShaderResult<CompiledShader<'gl, C>> {
        self.ctx.compile_shader(self.id);
        if self.ctx.shader_compile_status(self.id) {
            log::debug!("compiled {} shader {}", self.shader_type, self.id.raw());
            return Ok(CompiledShader { shader: self });
        }

        let mut log = self.ctx.shader_info_log(self.id);
        if log.trim().is_empty() {
            log = format!("{} shader did not compile and the driver gave no log", self.shader_type);
        }
        log::error!("{}", log);
        // Dropping `self` deletes the stage.
        Err(ShaderError::Compile { stage: self.shader_type, log })
    }
}

impl<'gl, C: GraphicsContext> Drop for Shader<'gl, C> {
    fn drop(&mut self) {
        log::trace!("deleting {} shader {}", self.shader_type, self.id.raw());
        self.ctx.delete_shader(self.id);
    }
}

/// A successfully compiled stage, ready to be attached to a program.
#[derive(Debug)]
pub struct CompiledShader<'gl, C: GraphicsContext> {
    pub(crate) shader: Shader<'gl, C>,
}

impl<'gl, C: GraphicsContext> CompiledShader<'gl, C> {
    pub fn id(&self) -> ShaderId {
        self.shader.id
    }
}
