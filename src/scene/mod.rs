//! Builds the triangle scene on whatever context a surface provides and
//! draws the single static frame.

use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

pub mod triangle;

use self::triangle::Triangle;
use crate::config::SceneConfig;
use crate::gl_api::context::GraphicsContext;
use crate::gl_api::error::GlError;
use crate::gl_api::headless::HeadlessContext;
use crate::gl_api::shader::program::Program;
use crate::gl_api::shader::{self, PipelineError};

pub const VERTEX_SOURCE: &str = include_str!("../../res/triangle.glslv");
pub const FRAGMENT_SOURCE: &str = include_str!("../../res/triangle.glslf");

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no graphics context is available")]
    ContextUnavailable,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("could not create a GPU object: {0}")]
    Gl(#[from] GlError),
    #[error("could not write image: {0}")]
    Export(String),
}

/// Something the scene can be presented on.
pub trait PresentationSurface {
    type Context: GraphicsContext;

    /// The surface's graphics context, or `None` if one could not be
    /// acquired.
    fn graphics_context(&self) -> Option<&Self::Context>;

    /// Size of the drawable area in pixels.
    fn drawable_size(&self) -> (u32, u32);
}

#[derive(Debug)]
pub struct Scene<'gl, C: GraphicsContext> {
    ctx: &'gl C,
    triangles: Vec<Triangle<'gl, C>>,
    program: Rc<Program<'gl, C>>,
    clear_color: [f32; 4],
}

impl<'gl, C: GraphicsContext> Scene<'gl, C> {
    /// Compiles the shared program and creates every configured triangle.
    pub fn new(ctx: &'gl C, config: &SceneConfig) -> Result<Self, SceneError> {
        let program = match (&config.vertex_shader, &config.fragment_shader) {
            (Some(vertex), Some(fragment)) => {
                log::info!("loading shaders from {} and {}", vertex.display(), fragment.display());
                shader::simple_pipeline_from_files(ctx, vertex, fragment)?
            }
            (None, None) => shader::simple_pipeline(ctx, VERTEX_SOURCE, FRAGMENT_SOURCE)?,
            _ => {
                log::warn!("only one shader file given; using the embedded shaders");
                shader::simple_pipeline(ctx, VERTEX_SOURCE, FRAGMENT_SOURCE)?
            }
        };
        let program = Rc::new(program);

        let triangles = config
            .triangles
            .iter()
            .map(|desc| {
                Triangle::with_vertex_colors(ctx, Rc::clone(&program), desc.position, desc.size, desc.colors)
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("scene has {} triangle(s)", triangles.len());

        Ok(Scene { ctx, triangles, program, clear_color: config.clear_color })
    }

    /// Draws one frame covering `(0, 0)` to `size`.
    pub fn render(&self, size: (u32, u32)) {
        let (width, height) = size;
        let [r, g, b, a] = self.clear_color;
        self.ctx.viewport(0, 0, width as i32, height as i32);
        self.program.bind();
        self.ctx.clear_color(r, g, b, a);
        self.ctx.clear();
        for triangle in &self.triangles {
            triangle.draw();
        }
    }

    pub fn triangles(&self) -> &[Triangle<'gl, C>] {
        &self.triangles
    }

    pub fn program(&self) -> &Rc<Program<'gl, C>> {
        &self.program
    }
}

/// Acquires the surface's context, builds the scene and renders it once.
///
/// A surface without a context is reported as
/// [`SceneError::ContextUnavailable`] instead of being silently skipped.
pub fn present<'s, S: PresentationSurface>(
    surface: &'s S,
    config: &SceneConfig,
) -> Result<Scene<'s, S::Context>, SceneError> {
    let ctx = match surface.graphics_context() {
        Some(ctx) => ctx,
        None => {
            log::warn!("no graphics context available; nothing will be rendered");
            return Err(SceneError::ContextUnavailable);
        }
    };

    let scene = Scene::new(ctx, config)?;
    scene.render(surface.drawable_size());
    Ok(scene)
}

/// An offscreen surface backed by [`HeadlessContext`].
#[derive(Debug)]
pub struct HeadlessSurface {
    context: Option<HeadlessContext>,
    size: (u32, u32),
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        HeadlessSurface { context: Some(HeadlessContext::new(width, height)), size: (width, height) }
    }

    /// A surface whose context could not be created.
    pub fn unavailable(width: u32, height: u32) -> Self {
        HeadlessSurface { context: None, size: (width, height) }
    }

    pub fn context(&self) -> Option<&HeadlessContext> {
        self.context.as_ref()
    }

    /// Writes the current framebuffer contents to an image file. The format
    /// follows the file extension.
    pub fn save_image<P: AsRef<Path>>(&self, path: P) -> Result<(), SceneError> {
        let ctx = self.context.as_ref().ok_or(SceneError::ContextUnavailable)?;
        let framebuffer = ctx.framebuffer();
        let (width, height) = framebuffer.dimensions();
        let image = image::RgbaImage::from_raw(width, height, framebuffer.to_rgba8())
            .ok_or_else(|| SceneError::Export("framebuffer size mismatch".to_string()))?;
        image.save(path.as_ref()).map_err(|err| SceneError::Export(err.to_string()))?;
        log::info!("wrote {}x{} image to {}", width, height, path.as_ref().display());
        Ok(())
    }
}

impl PresentationSurface for HeadlessSurface {
    type Context = HeadlessContext;

    fn graphics_context(&self) -> Option<&HeadlessContext> {
        self.context.as_ref()
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl_api::headless::Call;

    #[test]
    fn render_orders_setup_before_draws() {
        let surface = HeadlessSurface::new(8, 8);
        let _scene = present(&surface, &SceneConfig::default()).unwrap();
        let calls = surface.context().unwrap().calls();

        let position = |wanted: fn(&Call) -> bool| calls.iter().position(wanted).unwrap();
        let viewport = position(|c| matches!(c, Call::Viewport(_)));
        let clear = position(|c| matches!(c, Call::Clear));
        let draw = position(|c| matches!(c, Call::DrawArrays { .. }));
        assert!(viewport < clear && clear < draw);
    }

    #[test]
    fn unavailable_context_is_reported() {
        let surface = HeadlessSurface::unavailable(8, 8);
        assert!(matches!(
            present(&surface, &SceneConfig::default()),
            Err(SceneError::ContextUnavailable)
        ));
        assert!(matches!(surface.save_image("unused.png"), Err(SceneError::ContextUnavailable)));
    }

    #[test]
    fn embedded_shaders_declare_the_vertex_inputs() {
        assert!(VERTEX_SOURCE.starts_with("#version 300 es"));
        assert!(VERTEX_SOURCE.contains("in vec2 vertex_position;"));
        assert!(VERTEX_SOURCE.contains("in vec3 vertex_color;"));
    }
}
