use std::process;

use hello_triangle::config::AppConfig;
use hello_triangle::logging::{init_logging, LoggingConfig};
use hello_triangle::scene::{self, HeadlessSurface, SceneError};
use hello_triangle::window::{WindowError, WindowSurface};
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Window(#[from] WindowError),
}

fn run_headless(config: &AppConfig) -> Result<(), AppError> {
    let (width, height) = (config.window.width, config.window.height);
    let surface = HeadlessSurface::new(width, height);
    scene::present(&surface, &config.scene)?;
    if let Some(path) = &config.headless_output {
        surface.save_image(path)?;
    }
    Ok(())
}

fn run_windowed(config: &AppConfig) -> Result<(), AppError> {
    let mut events_loop = glutin::EventsLoop::new();
    let surface = WindowSurface::open(&events_loop, &config.window)?;
    let scene = scene::present(&surface, &config.scene)?;
    surface.swap_buffers()?;

    // The frame is static; it is only redrawn when the window system asks.
    let mut result = Ok(());
    events_loop.run_forever(|event| {
        let redraw = match event {
            glutin::Event::WindowEvent { event, .. } => match event {
                glutin::WindowEvent::CloseRequested => return glutin::ControlFlow::Break,
                glutin::WindowEvent::Resized(w, h) => {
                    surface.resize(w, h);
                    true
                }
                glutin::WindowEvent::Refresh => true,
                _ => false,
            },
            _ => false,
        };

        if redraw {
            scene.render(surface.drawable_size());
            if let Err(err) = surface.swap_buffers() {
                result = Err(err.into());
                return glutin::ControlFlow::Break;
            }
        }
        glutin::ControlFlow::Continue
    });
    result
}

fn main() {
    let config = match AppConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            init_logging(LoggingConfig::default());
            log::error!("{}", err);
            log::error!(
                "usage: hello-triangle [--headless <png>] [--size <W>x<H>] [--vertex <path>] \
                 [--fragment <path>] [--triangle x,y,w,h,r,g,b[,r,g,b,r,g,b]]... [--log <filter>] [--no-vsync]"
            );
            process::exit(2);
        }
    };
    init_logging(LoggingConfig { filter: config.log_filter.clone(), ..Default::default() });

    let result = match config.headless_output {
        Some(_) => run_headless(&config),
        None => run_windowed(&config),
    };
    if let Err(err) = result {
        log::error!("{}", err);
        process::exit(1);
    }
}
