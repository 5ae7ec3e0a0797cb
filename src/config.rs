//! Runtime configuration with defaults that reproduce the stock demo.

use std::path::PathBuf;

use cgmath::{Vector2, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown argument `{0}`")]
    UnknownArgument(String),
    #[error("`{0}` expects a value")]
    MissingValue(&'static str),
    #[error("invalid size `{0}`, expected <width>x<height>")]
    InvalidSize(String),
    #[error("invalid triangle `{0}`, expected x,y,width,height followed by one or three r,g,b colors")]
    InvalidTriangle(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Requested desktop GL version, `(major, minor)`.
    pub gl_version: (u8, u8),
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title: "Hello Triangle".to_string(),
            width: 800,
            height: 600,
            gl_version: (4, 3),
            vsync: true,
        }
    }
}

/// Placement and corner colors of one triangle in the scene.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangleDesc {
    pub position: Vector2<f32>,
    pub size: Vector2<f32>,
    /// Top left, top right, bottom middle.
    pub colors: [Vector3<f32>; 3],
}

impl TriangleDesc {
    /// Parses `x,y,width,height` followed by either one `r,g,b` used for
    /// every corner or three of them, one per corner.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidTriangle(text.to_string());
        let values = text
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        let colors = match values.get(4..).unwrap_or(&[]) {
            &[r, g, b] => [Vector3::new(r, g, b); 3],
            rgb @ &[_, _, _, _, _, _, _, _, _] => {
                let corner = |i: usize| Vector3::new(rgb[i], rgb[i + 1], rgb[i + 2]);
                [corner(0), corner(3), corner(6)]
            }
            _ => return Err(invalid()),
        };
        Ok(TriangleDesc {
            position: Vector2::new(values[0], values[1]),
            size: Vector2::new(values[2], values[3]),
            colors,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub clear_color: [f32; 4],
    /// Drawn in order, so later triangles cover earlier ones.
    pub triangles: Vec<TriangleDesc>,
    /// Shader files to load instead of the embedded sources. Both must be
    /// set for either to take effect.
    pub vertex_shader: Option<PathBuf>,
    pub fragment_shader: Option<PathBuf>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            clear_color: [0.5, 0.0, 0.25, 1.0],
            triangles: vec![TriangleDesc {
                position: Vector2::new(0.0, 0.0),
                size: Vector2::new(1.0, 1.0),
                colors: [
                    Vector3::new(1.0, 0.0, 0.0),
                    Vector3::new(0.0, 1.0, 0.0),
                    Vector3::new(0.0, 0.0, 1.0),
                ],
            }],
            vertex_shader: None,
            fragment_shader: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub scene: SceneConfig,
    pub log_filter: Option<String>,
    /// Render once without a window and write a PNG here.
    pub headless_output: Option<PathBuf>,
}

impl AppConfig {
    /// Builds a configuration from command-line arguments, not including
    /// the program name.
    ///
    /// `--triangle` may be repeated; when present it replaces the default
    /// triangle list.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut config = AppConfig::default();
        let mut triangles = vec![];
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let mut value = |flag: &'static str| args.next().ok_or(ConfigError::MissingValue(flag));
            match arg.as_str() {
                "--headless" => config.headless_output = Some(value("--headless")?.into()),
                "--size" => {
                    let (width, height) = parse_size(&value("--size")?)?;
                    config.window.width = width;
                    config.window.height = height;
                }
                "--vertex" => config.scene.vertex_shader = Some(value("--vertex")?.into()),
                "--fragment" => config.scene.fragment_shader = Some(value("--fragment")?.into()),
                "--log" => config.log_filter = Some(value("--log")?),
                "--triangle" => triangles.push(TriangleDesc::parse(&value("--triangle")?)?),
                "--no-vsync" => config.window.vsync = false,
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        if !triangles.is_empty() {
            config.scene.triangles = triangles;
        }
        Ok(config)
    }
}

fn parse_size(text: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::InvalidSize(text.to_string());
    let (width, height) = text.split_once('x').ok_or_else(invalid)?;
    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}
