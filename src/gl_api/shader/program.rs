use thiserror::Error;

use super::shader::{Shader, ShaderError, ShaderType};
use crate::gl_api::context::{GraphicsContext, ProgramId};
use crate::gl_api::error::GlError;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("could not create program: {0}")]
    Creation(#[source] GlError),
    #[error("program failed to link:\n{log}")]
    Link { log: String },
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Compiles a vertex and a fragment stage and links them into a [`Program`].
#[derive(Debug)]
pub struct ProgramBuilder<'gl, C: GraphicsContext> {
    ctx: &'gl C,
    vertex: Shader<'gl, C>,
    fragment: Shader<'gl, C>,
}

impl<'gl, C: GraphicsContext> ProgramBuilder<'gl, C> {
    pub fn new(ctx: &'gl C, vertex: Shader<'gl, C>, fragment: Shader<'gl, C>) -> Self {
        debug_assert_eq!(vertex.shader_type(), ShaderType::Vertex);
        debug_assert_eq!(fragment.shader_type(), ShaderType::Fragment);
        ProgramBuilder { ctx, vertex, fragment }
    }

    pub fn build(self) -> Result<Program<'gl, C>, ProgramError> {
        let vertex = self.vertex.compile()?;
        let fragment = self.fragment.compile()?;

        let id = self.ctx.create_program().map_err(ProgramError::Creation)?;
        let program = Program { ctx: self.ctx, id };
        self.ctx.attach_shader(id, vertex.id());
        self.ctx.attach_shader(id, fragment.id());
        self.ctx.link_program(id);

        if !self.ctx.program_link_status(id) {
            let mut log = self.ctx.program_info_log(id);
            if log.trim().is_empty() {
                log = "program did not link and the driver gave no log".to_string();
            }
            log::error!("{}", log);
            // `program` and both stages are released on return.
            return Err(ProgramError::Link { log });
        }

        log::debug!("linked program {}", id.raw());
        // The stages can go once linked; the program keeps what it needs.
        Ok(program)
    }
}

/// A linked shader program. Deleted when dropped.
#[derive(Debug)]
pub struct Program<'gl, C: GraphicsContext> {
    ctx: &'gl C,
    id: ProgramId,
}

impl<'gl, C: GraphicsContext> Program<'gl, C> {
    pub fn bind(&self) {
        self.ctx.use_program(Some(self.id));
    }

    pub fn attrib_location(&self, name: &str) -> Option<u32> {
        self.ctx.attrib_location(self.id, name)
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn context(&self) -> &'gl C {
        self.ctx
    }
}

impl<'gl, C: GraphicsContext> Drop for Program<'gl, C> {
    fn drop(&mut self) {
        log::trace!("deleting program {}", self.id.raw());
        self.ctx.delete_program(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl_api::headless::HeadlessContext;
    use crate::test_log;
    use log::Level;

    const VERTEX: &str = "#version 300 es\nin vec2 pos;\nout vec3 tint;\nvoid main() {\n  tint = vec3(1.0);\n  gl_Position = vec4(pos, 0.0, 1.0);\n}\n";

    fn stages(ctx: &HeadlessContext, fragment: &str) -> ProgramBuilder<'_, HeadlessContext> {
        let vert = Shader::new(ctx, ShaderType::Vertex).unwrap();
        vert.source(VERTEX);
        let frag = Shader::new(ctx, ShaderType::Fragment).unwrap();
        frag.source(fragment);
        ProgramBuilder::new(ctx, vert, frag)
    }

    #[test]
    fn linked_program_exposes_attributes() {
        let ctx = HeadlessContext::new(1, 1);
        let frag = "#version 300 es\nprecision highp float;\nin vec3 tint;\nout vec4 color;\nvoid main() {\n  color = vec4(tint, 1.0);\n}\n";
        let program = stages(&ctx, frag).build().unwrap();
        assert_eq!(program.attrib_location("pos"), Some(0));
        assert_eq!(program.attrib_location("nope"), None);
        drop(program);
        assert_eq!(ctx.live_objects(), 0);
    }

    #[test]
    fn link_failure_reports_log_and_releases_everything() {
        test_log::install();
        let ctx = HeadlessContext::new(1, 1);
        let frag = "#version 300 es\nprecision highp float;\nin vec3 shade;\nout vec4 color;\nvoid main() {\n  color = vec4(shade, 1.0);\n}\n";
        match stages(&ctx, frag).build() {
            Err(ProgramError::Link { log }) => {
                assert!(log.contains("'shade'"), "{}", log);
                assert!(test_log::logged(Level::Error, &log));
            }
            other => panic!("expected a link error, got {:?}", other),
        }
        assert_eq!(ctx.live_objects(), 0);
    }
}
