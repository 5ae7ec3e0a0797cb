//! Drawables and the scene driver against the headless context.

use std::fs;
use std::rc::Rc;

use cgmath::{Vector2, Vector3};
use hello_triangle::config::{SceneConfig, TriangleDesc};
use hello_triangle::gl_api::context::GraphicsContext;
use hello_triangle::gl_api::headless::{Call, HeadlessContext};
use hello_triangle::gl_api::shader::simple_pipeline;
use hello_triangle::scene::triangle::Triangle;
use hello_triangle::scene::{present, HeadlessSurface, SceneError, FRAGMENT_SOURCE, VERTEX_SOURCE};
use tempfile::TempDir;

fn rgba8(pixel: [f32; 4]) -> [u8; 4] {
    pixel.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn desc(x: f32, y: f32, w: f32, h: f32, color: [f32; 3]) -> TriangleDesc {
    TriangleDesc {
        position: Vector2::new(x, y),
        size: Vector2::new(w, h),
        colors: [Vector3::new(color[0], color[1], color[2]); 3],
    }
}

#[test]
fn triangle_uploads_derived_vertices() {
    let ctx = HeadlessContext::new(4, 4);
    let program = Rc::new(simple_pipeline(&ctx, VERTEX_SOURCE, FRAGMENT_SOURCE).unwrap());
    let triangle = Triangle::new(
        &ctx,
        program,
        Vector2::new(0.0, 0.0),
        Vector2::new(0.5, 0.75),
        Vector3::new(1.0, 1.0, 0.0),
    )
    .unwrap();

    let uploaded = triangle.read_back().unwrap();
    let positions: Vec<_> = uploaded.iter().map(|v| v.vertex_position).collect();
    assert_eq!(positions, [[-0.25, 0.375], [0.25, 0.375], [0.0, -0.375]]);
    assert!(uploaded.iter().all(|v| v.vertex_color == [1.0, 1.0, 0.0]));
    assert_eq!(&uploaded[..], &triangle.vertices()[..]);

    let pointers: Vec<_> = ctx
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::VertexAttribPointer { location, components, stride, offset } => {
                Some((location, components, stride, offset))
            }
            _ => None,
        })
        .collect();
    assert_eq!(pointers, [(0, 2, 20, 0), (1, 3, 20, 8)]);
}

#[test]
fn draw_before_viewport_does_not_fail() {
    let ctx = HeadlessContext::new(4, 4);
    let program = Rc::new(simple_pipeline(&ctx, VERTEX_SOURCE, FRAGMENT_SOURCE).unwrap());
    let triangle = Triangle::new(
        &ctx,
        program,
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector3::new(1.0, 0.0, 0.0),
    )
    .unwrap();

    assert_eq!(ctx.viewport_rect(), None);
    triangle.draw();
    assert_eq!(ctx.draw_calls(), 1);
    assert!(ctx.take_errors().is_empty());
}

#[test]
fn triangles_do_not_share_vertex_data() {
    let ctx = HeadlessContext::new(4, 4);
    let program = Rc::new(simple_pipeline(&ctx, VERTEX_SOURCE, FRAGMENT_SOURCE).unwrap());
    let a = Triangle::new(
        &ctx,
        Rc::clone(&program),
        Vector2::new(-0.5, 0.0),
        Vector2::new(0.5, 0.5),
        Vector3::new(1.0, 0.0, 0.0),
    )
    .unwrap();
    let before = a.read_back().unwrap();

    let b = Triangle::new(
        &ctx,
        Rc::clone(&program),
        Vector2::new(0.5, 0.0),
        Vector2::new(0.25, 0.25),
        Vector3::new(0.0, 0.0, 1.0),
    )
    .unwrap();
    a.draw();
    b.draw();

    assert_eq!(a.read_back().unwrap(), before);
    assert_ne!(b.read_back().unwrap(), before);
    assert!(Rc::ptr_eq(a.program(), b.program()));
    assert_eq!(Rc::strong_count(&program), 3);
}

#[test]
fn end_to_end_draws_once() {
    let ctx = HeadlessContext::new(8, 8);
    let program = Rc::new(simple_pipeline(&ctx, VERTEX_SOURCE, FRAGMENT_SOURCE).unwrap());
    let triangle = Triangle::new(
        &ctx,
        program,
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector3::new(1.0, 0.0, 0.0),
    )
    .unwrap();

    ctx.viewport(0, 0, 8, 8);
    ctx.clear_color(0.0, 0.0, 0.0, 1.0);
    ctx.clear();
    triangle.draw();

    assert_eq!(ctx.draw_calls(), 1);
    assert!(ctx.take_errors().is_empty());
    let framebuffer = ctx.framebuffer();
    assert_eq!(rgba8(framebuffer.pixel(4, 4).unwrap()), [255, 0, 0, 255]);
    assert_eq!(rgba8(framebuffer.pixel(0, 0).unwrap()), [0, 0, 0, 255]);
}

#[test]
fn present_renders_the_default_scene() {
    let surface = HeadlessSurface::new(64, 64);
    let config = SceneConfig::default();
    let scene = present(&surface, &config).unwrap();
    let ctx = surface.context().unwrap();

    assert_eq!(scene.triangles().len(), 1);
    assert_eq!(Rc::strong_count(scene.program()), 2);
    assert_eq!(ctx.draw_calls(), 1);
    let framebuffer = ctx.framebuffer();
    // Corners keep the clear color; the triangle covers the center.
    assert_eq!(rgba8(framebuffer.pixel(0, 0).unwrap()), rgba8(config.clear_color));
    let center = framebuffer.pixel(32, 32).unwrap();
    assert_ne!(rgba8(center), rgba8(config.clear_color));
    assert!((center.iter().take(3).sum::<f32>() - 1.0).abs() < 1e-4, "{:?}", center);
}

#[test]
fn default_scene_blends_red_green_and_blue_corners() {
    let surface = HeadlessSurface::new(64, 64);
    present(&surface, &SceneConfig::default()).unwrap();
    let framebuffer = surface.context().unwrap().framebuffer();

    // Rows count up from the bottom. The triangle spans x 16..48 and
    // y 16..48 with the red and green corners on top.
    let dominant = |x, y| {
        let [r, g, b, _] = framebuffer.pixel(x, y).unwrap();
        if r > g && r > b {
            "red"
        } else if g > r && g > b {
            "green"
        } else if b > r && b > g {
            "blue"
        } else {
            "mixed"
        }
    };
    assert_eq!(dominant(18, 46), "red");
    assert_eq!(dominant(45, 46), "green");
    assert_eq!(dominant(32, 18), "blue");
}

#[test]
fn later_triangles_draw_over_earlier_ones() {
    let surface = HeadlessSurface::new(16, 16);
    let config = SceneConfig {
        triangles: vec![
            desc(0.0, 0.0, 1.0, 1.0, [1.0, 0.0, 0.0]),
            desc(0.0, 0.0, 1.0, 1.0, [0.0, 0.0, 1.0]),
        ],
        ..SceneConfig::default()
    };
    let _scene = present(&surface, &config).unwrap();

    let ctx = surface.context().unwrap();
    assert_eq!(ctx.draw_calls(), 2);
    assert_eq!(rgba8(ctx.framebuffer().pixel(8, 8).unwrap()), [0, 0, 255, 255]);
}

#[test]
fn dropping_the_scene_releases_every_object() {
    let surface = HeadlessSurface::new(4, 4);
    let config = SceneConfig {
        triangles: vec![desc(0.0, 0.0, 1.0, 1.0, [1.0; 3]), desc(0.5, 0.5, 0.5, 0.5, [0.0; 3])],
        ..SceneConfig::default()
    };
    let scene = present(&surface, &config).unwrap();
    let ctx = surface.context().unwrap();
    // One program plus a buffer and a vertex array per triangle.
    assert_eq!(ctx.live_objects(), 5);
    drop(scene);
    assert_eq!(ctx.live_objects(), 0);
}

#[test]
fn missing_context_is_reported() {
    let surface = HeadlessSurface::unavailable(4, 4);
    let err = present(&surface, &SceneConfig::default()).unwrap_err();
    assert!(matches!(err, SceneError::ContextUnavailable));
}

#[test]
fn shader_errors_abort_the_scene() {
    let dir = TempDir::new().unwrap();
    let vert = dir.path().join("broken.glslv");
    let frag = dir.path().join("triangle.glslf");
    fs::write(&vert, VERTEX_SOURCE.replace("fragment_color = vertex_color;", "fragment_color = colour;")).unwrap();
    fs::write(&frag, FRAGMENT_SOURCE).unwrap();

    let surface = HeadlessSurface::new(4, 4);
    let config = SceneConfig {
        vertex_shader: Some(vert),
        fragment_shader: Some(frag),
        ..SceneConfig::default()
    };
    let err = present(&surface, &config).unwrap_err();
    assert!(matches!(err, SceneError::Pipeline(_)));
    assert!(err.to_string().contains("'colour' : undeclared identifier"), "{}", err);

    let ctx = surface.context().unwrap();
    assert_eq!(ctx.draw_calls(), 0);
    assert_eq!(ctx.live_objects(), 0);
}

#[test]
fn headless_export_writes_a_png() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frame.png");
    let surface = HeadlessSurface::new(8, 8);
    present(&surface, &SceneConfig::default()).unwrap();
    surface.save_image(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}
