use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod program;
pub mod shader;

use self::program::*;
use self::shader::*;
use crate::gl_api::context::GraphicsContext;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error("could not read shader source `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<ShaderError> for PipelineError {
    fn from(err: ShaderError) -> Self {
        PipelineError::Program(ProgramError::Shader(err))
    }
}

/// Builds a vertex + fragment program from in-memory GLSL.
pub fn simple_pipeline<'gl, C: GraphicsContext>(
    ctx: &'gl C,
    vert: &str,
    frag: &str,
) -> Result<Program<'gl, C>, PipelineError> {
    let vert_shader = Shader::new(ctx, ShaderType::Vertex)?;
    let frag_shader = Shader::new(ctx, ShaderType::Fragment)?;

    vert_shader.source(vert);
    frag_shader.source(frag);

    Ok(ProgramBuilder::new(ctx, vert_shader, frag_shader).build()?)
}

pub fn simple_pipeline_from_files<'gl, C, P1, P2>(
    ctx: &'gl C,
    vert: P1,
    frag: P2,
) -> Result<Program<'gl, C>, PipelineError>
where
    C: GraphicsContext,
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let vert_shader = Shader::new(ctx, ShaderType::Vertex)?;
    let frag_shader = Shader::new(ctx, ShaderType::Fragment)?;

    let read = |shader: &Shader<'gl, C>, path: &Path| {
        shader.source_from_file(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    read(&vert_shader, vert.as_ref())?;
    read(&frag_shader, frag.as_ref())?;

    Ok(ProgramBuilder::new(ctx, vert_shader, frag_shader).build()?)
}
