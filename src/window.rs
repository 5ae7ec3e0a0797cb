//! An on-screen surface: a glutin window with a desktop GL context.

use glutin::{Api, GlContext, GlRequest};
use thiserror::Error;

use crate::config::WindowConfig;
use crate::gl_api::native::NativeContext;
use crate::scene::PresentationSurface;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("could not create window: {0}")]
    Creation(#[from] glutin::CreationError),
    #[error("could not present frame: {0}")]
    Context(#[from] glutin::ContextError),
}

pub struct WindowSurface {
    gl_window: glutin::GlWindow,
    context: Option<NativeContext>,
}

impl WindowSurface {
    /// Opens a window on `events_loop` and makes its context current.
    ///
    /// Failing to make the context current or to load GL is not an error
    /// here: the surface is still returned, just without a graphics context.
    pub fn open(events_loop: &glutin::EventsLoop, config: &WindowConfig) -> Result<Self, WindowError> {
        let window = glutin::WindowBuilder::new()
            .with_title(config.title.clone())
            .with_dimensions(config.width, config.height);
        let context = glutin::ContextBuilder::new()
            .with_gl(GlRequest::Specific(Api::OpenGl, config.gl_version))
            .with_vsync(config.vsync);
        let gl_window = glutin::GlWindow::new(window, context, events_loop)?;

        let context = match unsafe { gl_window.make_current() } {
            Ok(()) => NativeContext::load(|symbol| gl_window.get_proc_address(symbol) as *const _),
            Err(err) => {
                log::warn!("could not make GL context current: {}", err);
                None
            }
        };

        Ok(WindowSurface { gl_window, context })
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.gl_window.resize(width, height);
    }

    pub fn swap_buffers(&self) -> Result<(), WindowError> {
        self.gl_window.swap_buffers()?;
        Ok(())
    }
}

impl PresentationSurface for WindowSurface {
    type Context = NativeContext;

    fn graphics_context(&self) -> Option<&NativeContext> {
        self.context.as_ref()
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.gl_window.get_inner_size().unwrap_or((0, 0))
    }
}
