//! A software [`GraphicsContext`].
//!
//! Objects live in host memory, every state-changing call is appended to a
//! call log, and `glDrawArrays` with triangles is rasterized into an RGBA
//! framebuffer. Shader programs are not executed: the attribute at location 0
//! is taken as the clip-space position and the attribute at location 1, when
//! enabled, as the vertex color, which is exactly what the pass-through
//! shaders in `res/` do.

pub mod glsl;
pub mod raster;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use super::context::*;
use super::error::{GlError, GlResult};

use self::glsl::{Attribute, Interface};
pub use self::raster::{Framebuffer, RasterVertex, Viewport};

/// One recorded capability call. Queries are not recorded.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateShader(ShaderType),
    ShaderSource(ShaderId),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram,
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    CreateBuffer,
    BindArrayBuffer(Option<BufferId>),
    BufferData { bytes: usize, usage: UsageType },
    DeleteBuffer(BufferId),
    CreateVertexArray,
    BindVertexArray(Option<VertexArrayId>),
    DeleteVertexArray(VertexArrayId),
    EnableVertexAttribArray(u32),
    VertexAttribPointer { location: u32, components: i32, stride: i32, offset: i32 },
    Viewport(Viewport),
    ClearColor([f32; 4]),
    Clear,
    DrawArrays { mode: Primitive, first: i32, count: i32 },
}

#[derive(Debug)]
struct ShaderObject {
    ty: ShaderType,
    source: String,
    compiled: bool,
    log: String,
    interface: Option<Interface>,
}

/// What a program keeps of a shader once it is attached. GL keeps attached
/// shaders alive past `glDeleteShader`; a snapshot gives the same behavior.
#[derive(Clone, Debug)]
struct AttachedStage {
    ty: ShaderType,
    interface: Option<Interface>,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<(ShaderId, AttachedStage)>,
    linked: bool,
    log: String,
    attributes: Vec<Attribute>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct AttribPointer {
    buffer: BufferId,
    components: i32,
    stride: i32,
    offset: i32,
}

#[derive(Debug, Default)]
struct VertexArrayObject {
    enabled: Vec<u32>,
    pointers: BTreeMap<u32, AttribPointer>,
}

impl VertexArrayObject {
    fn enabled_pointer(&self, location: u32) -> Option<AttribPointer> {
        if self.enabled.contains(&location) {
            self.pointers.get(&location).copied()
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct State {
    next_name: u32,
    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    buffers: HashMap<BufferId, Vec<u8>>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayObject>,

    array_buffer: Option<BufferId>,
    vertex_array: Option<VertexArrayId>,
    program: Option<ProgramId>,
    viewport: Option<Viewport>,
    clear_color: [f32; 4],

    framebuffer: Framebuffer,
    calls: Vec<Call>,
    errors: Vec<GlError>,
}

impl State {
    fn next_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn record_error(&mut self, op: &str, err: GlError) {
        log::debug!("headless {}: {}", op, err);
        self.errors.push(err);
    }

    /// Reads `components` floats for vertex `index` through `pointer`.
    fn fetch(&self, pointer: AttribPointer, index: i32) -> Option<[f32; 3]> {
        let data = self.buffers.get(&pointer.buffer)?;
        let size = 4 * pointer.components as usize;
        let stride = if pointer.stride == 0 { size } else { pointer.stride as usize };
        let start = stride.checked_mul(index as usize)?.checked_add(pointer.offset as usize)?;
        let bytes = data.get(start..start.checked_add(size)?)?;

        let mut out = [0.0; 3];
        for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *slot = bytemuck::pod_read_unaligned::<f32>(chunk);
        }
        Some(out)
    }

    fn draw_triangles(&mut self, first: i32, count: i32) -> GlResult<usize> {
        let viewport = match self.viewport {
            Some(viewport) => viewport,
            None => {
                log::debug!("headless draw without a viewport; nothing rasterized");
                return Ok(0);
            }
        };

        let program = self
            .program
            .and_then(|id| self.programs.get(&id))
            .filter(|program| program.linked)
            .ok_or(GlError::INVALID_OPERATION)?;
        let vao = self
            .vertex_array
            .and_then(|id| self.vertex_arrays.get(&id))
            .ok_or(GlError::INVALID_OPERATION)?;

        let pointer = |location: u32| {
            let active = program.attributes.iter().any(|a| a.location == location);
            if active {
                vao.enabled_pointer(location)
            } else {
                None
            }
        };
        let position = pointer(0).ok_or(GlError::INVALID_OPERATION)?;
        let color = pointer(1);

        let mut triangles = vec![];
        for start in (first..first + count - count % 3).step_by(3) {
            let mut vertices = [RasterVertex { position: [0.0; 2], color: [1.0; 3] }; 3];
            for (corner, vertex) in vertices.iter_mut().enumerate() {
                let index = start + corner as i32;
                let xy = self.fetch(position, index).ok_or(GlError::INVALID_OPERATION)?;
                vertex.position = [xy[0], xy[1]];
                if let Some(color) = color {
                    vertex.color = self.fetch(color, index).ok_or(GlError::INVALID_OPERATION)?;
                }
            }
            triangles.push(vertices);
        }

        let framebuffer = &mut self.framebuffer;
        Ok(triangles
            .iter()
            .map(|vertices| framebuffer.fill_triangle(viewport, vertices))
            .sum())
    }
}

/// A [`GraphicsContext`] that needs no driver.
#[derive(Debug)]
pub struct HeadlessContext {
    state: RefCell<State>,
}

impl HeadlessContext {
    /// Creates a context whose default framebuffer is `width` x `height`.
    /// Like a fresh GL context, it starts with no viewport configured.
    pub fn new(width: u32, height: u32) -> Self {
        HeadlessContext {
            state: RefCell::new(State {
                next_name: 0,
                shaders: HashMap::new(),
                programs: HashMap::new(),
                buffers: HashMap::new(),
                vertex_arrays: HashMap::new(),
                array_buffer: None,
                vertex_array: None,
                program: None,
                viewport: None,
                clear_color: [0.0; 4],
                framebuffer: Framebuffer::new(width, height),
                calls: vec![],
                errors: vec![],
            }),
        }
    }

    /// A copy of the color buffer as it is now. Later calls do not affect
    /// the returned value.
    pub fn framebuffer(&self) -> Framebuffer {
        self.state.borrow().framebuffer.clone()
    }

    pub fn viewport_rect(&self) -> Option<Viewport> {
        self.state.borrow().viewport
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn draw_calls(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::DrawArrays { .. }))
            .count()
    }

    /// Shaders, programs, buffers and vertex arrays not yet deleted.
    pub fn live_objects(&self) -> usize {
        let state = self.state.borrow();
        state.shaders.len() + state.programs.len() + state.buffers.len() + state.vertex_arrays.len()
    }

    /// Drains the errors raised so far, like repeated `glGetError` calls.
    pub fn take_errors(&self) -> Vec<GlError> {
        ::std::mem::take(&mut self.state.borrow_mut().errors)
    }

    fn record(&self, call: Call) {
        log::trace!("headless {:?}", call);
        self.state.borrow_mut().calls.push(call);
    }
}

impl GraphicsContext for HeadlessContext {
    fn create_shader(&self, ty: ShaderType) -> GlResult<ShaderId> {
        self.record(Call::CreateShader(ty));
        let mut state = self.state.borrow_mut();
        let id = ShaderId::from_raw(state.next_name()).ok_or(GlError::ObjectCreation("shader"))?;
        state.shaders.insert(
            id,
            ShaderObject { ty, source: String::new(), compiled: false, log: String::new(), interface: None },
        );
        Ok(id)
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        self.record(Call::ShaderSource(shader));
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_string(),
            None => state.record_error("glShaderSource", GlError::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        self.record(Call::CompileShader(shader));
        let mut state = self.state.borrow_mut();
        let object = match state.shaders.get_mut(&shader) {
            Some(object) => object,
            None => return state.record_error("glCompileShader", GlError::INVALID_VALUE),
        };

        match glsl::check(object.ty, &object.source) {
            Ok(interface) => {
                object.compiled = true;
                object.log.clear();
                object.interface = Some(interface);
            }
            Err(log) => {
                object.compiled = false;
                object.log = log;
                object.interface = None;
            }
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.state.borrow().shaders.get(&shader).map_or(false, |object| object.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.record(Call::DeleteShader(shader));
        self.state.borrow_mut().shaders.remove(&shader);
    }

    fn create_program(&self) -> GlResult<ProgramId> {
        self.record(Call::CreateProgram);
        let mut state = self.state.borrow_mut();
        let id = ProgramId::from_raw(state.next_name()).ok_or(GlError::ObjectCreation("program"))?;
        state.programs.insert(id, ProgramObject::default());
        Ok(id)
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        self.record(Call::AttachShader(program, shader));
        let mut state = self.state.borrow_mut();
        let stage = match state.shaders.get(&shader) {
            Some(object) => AttachedStage { ty: object.ty, interface: object.interface.clone() },
            None => return state.record_error("glAttachShader", GlError::INVALID_VALUE),
        };
        let object = match state.programs.get_mut(&program) {
            Some(object) => object,
            None => return state.record_error("glAttachShader", GlError::INVALID_VALUE),
        };
        if object.attached.iter().any(|(id, _)| *id == shader) {
            return state.record_error("glAttachShader", GlError::INVALID_OPERATION);
        }
        object.attached.push((shader, stage));
    }

    fn link_program(&self, program: ProgramId) {
        self.record(Call::LinkProgram(program));
        let mut state = self.state.borrow_mut();
        let object = match state.programs.get_mut(&program) {
            Some(object) => object,
            None => return state.record_error("glLinkProgram", GlError::INVALID_VALUE),
        };

        let stage = |wanted: ShaderType| {
            let mut stages = object.attached.iter().filter(|(_, stage)| stage.ty == wanted);
            match (stages.next(), stages.next()) {
                (Some((_, stage)), None) => stage.interface.as_ref().ok_or_else(|| {
                    format!("ERROR: Attached {} shader is not compiled.", wanted)
                }),
                (None, _) => Err(format!("ERROR: No {} shader attached.", wanted)),
                (Some(_), Some(_)) => {
                    Err(format!("ERROR: Multiple {} shaders attached.", wanted))
                }
            }
        };

        let result = stage(ShaderType::Vertex).and_then(|vertex| {
            let fragment = stage(ShaderType::Fragment)?;
            glsl::link(vertex, fragment)
        });

        match result {
            Ok(attributes) => {
                object.linked = true;
                object.log.clear();
                object.attributes = attributes;
            }
            Err(log) => {
                object.linked = false;
                object.log = log;
                object.attributes.clear();
            }
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.state.borrow().programs.get(&program).map_or(false, |object| object.linked)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: ProgramId) {
        self.record(Call::DeleteProgram(program));
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.program == Some(program) {
            state.program = None;
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.record(Call::UseProgram(program));
        let mut state = self.state.borrow_mut();
        let linked = program.map_or(true, |id| {
            state.programs.get(&id).map_or(false, |object| object.linked)
        });
        if linked {
            state.program = program;
        } else {
            state.record_error("glUseProgram", GlError::INVALID_OPERATION);
        }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let object = state.programs.get(&program).filter(|object| object.linked)?;
        object
            .attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.location)
    }

    fn create_buffer(&self) -> GlResult<BufferId> {
        self.record(Call::CreateBuffer);
        let mut state = self.state.borrow_mut();
        let id = BufferId::from_raw(state.next_name()).ok_or(GlError::ObjectCreation("buffer"))?;
        state.buffers.insert(id, vec![]);
        Ok(id)
    }

    fn bind_array_buffer(&self, buffer: Option<BufferId>) {
        self.record(Call::BindArrayBuffer(buffer));
        let mut state = self.state.borrow_mut();
        match buffer {
            Some(id) if !state.buffers.contains_key(&id) => {
                state.record_error("glBindBuffer", GlError::INVALID_OPERATION)
            }
            _ => state.array_buffer = buffer,
        }
    }

    fn buffer_data(&self, data: &[u8], usage: UsageType) -> GlResult<()> {
        self.record(Call::BufferData { bytes: data.len(), usage });
        let mut state = self.state.borrow_mut();
        let bound = state.array_buffer;
        match bound.and_then(|id| state.buffers.get_mut(&id)) {
            Some(store) => {
                *store = data.to_vec();
                Ok(())
            }
            None => {
                state.record_error("glBufferData", GlError::INVALID_OPERATION);
                Err(GlError::INVALID_OPERATION)
            }
        }
    }

    fn read_buffer(&self, buffer: BufferId) -> GlResult<Vec<u8>> {
        self.state
            .borrow()
            .buffers
            .get(&buffer)
            .cloned()
            .ok_or(GlError::INVALID_OPERATION)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.record(Call::DeleteBuffer(buffer));
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        if state.array_buffer == Some(buffer) {
            state.array_buffer = None;
        }
    }

    fn create_vertex_array(&self) -> GlResult<VertexArrayId> {
        self.record(Call::CreateVertexArray);
        let mut state = self.state.borrow_mut();
        let id = VertexArrayId::from_raw(state.next_name())
            .ok_or(GlError::ObjectCreation("vertex array"))?;
        state.vertex_arrays.insert(id, VertexArrayObject::default());
        Ok(id)
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayId>) {
        self.record(Call::BindVertexArray(vao));
        let mut state = self.state.borrow_mut();
        match vao {
            Some(id) if !state.vertex_arrays.contains_key(&id) => {
                state.record_error("glBindVertexArray", GlError::INVALID_OPERATION)
            }
            _ => state.vertex_array = vao,
        }
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        self.record(Call::DeleteVertexArray(vao));
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(&vao);
        if state.vertex_array == Some(vao) {
            state.vertex_array = None;
        }
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.record(Call::EnableVertexAttribArray(location));
        let mut state = self.state.borrow_mut();
        let bound = state.vertex_array;
        match bound.and_then(|id| state.vertex_arrays.get_mut(&id)) {
            Some(vao) => {
                if !vao.enabled.contains(&location) {
                    vao.enabled.push(location);
                }
            }
            None => state.record_error("glEnableVertexAttribArray", GlError::INVALID_OPERATION),
        }
    }

    fn vertex_attrib_pointer_f32(&self, location: u32, components: i32, stride: i32, offset: i32) {
        self.record(Call::VertexAttribPointer { location, components, stride, offset });
        let mut state = self.state.borrow_mut();
        if !(1..=4).contains(&components) || stride < 0 || offset < 0 {
            return state.record_error("glVertexAttribPointer", GlError::INVALID_VALUE);
        }

        let (vao, buffer) = (state.vertex_array, state.array_buffer);
        match (vao.and_then(|id| state.vertex_arrays.get_mut(&id)), buffer) {
            (Some(vao), Some(buffer)) => {
                vao.pointers.insert(location, AttribPointer { buffer, components, stride, offset });
            }
            _ => state.record_error("glVertexAttribPointer", GlError::INVALID_OPERATION),
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let viewport = Viewport { x, y, width, height };
        self.record(Call::Viewport(viewport));
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 {
            state.record_error("glViewport", GlError::INVALID_VALUE);
        } else {
            state.viewport = Some(viewport);
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearColor([r, g, b, a]));
        self.state.borrow_mut().clear_color = [r, g, b, a];
    }

    fn clear(&self) {
        self.record(Call::Clear);
        let mut state = self.state.borrow_mut();
        let color = state.clear_color;
        state.framebuffer.clear(color);
    }

    fn draw_arrays(&self, mode: Primitive, first: i32, count: i32) {
        self.record(Call::DrawArrays { mode, first, count });
        let mut state = self.state.borrow_mut();
        if first < 0 || count < 0 {
            return state.record_error("glDrawArrays", GlError::INVALID_VALUE);
        }
        if first.checked_add(count).is_none() {
            // The vertex range cannot exist in any buffer.
            return state.record_error("glDrawArrays", GlError::INVALID_OPERATION);
        }
        if mode != Primitive::Triangles {
            log::debug!("headless context only rasterizes triangles; {:?} skipped", mode);
            return;
        }

        match state.draw_triangles(first, count) {
            Ok(pixels) => log::trace!("headless draw wrote {} pixels", pixels),
            Err(err) => state.record_error("glDrawArrays", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_get_distinct_names_and_are_released() {
        let ctx = HeadlessContext::new(4, 4);
        let a = ctx.create_buffer().unwrap();
        let b = ctx.create_buffer().unwrap();
        let vao = ctx.create_vertex_array().unwrap();
        assert_ne!(a, b);
        assert_eq!(ctx.live_objects(), 3);

        ctx.delete_buffer(a);
        ctx.delete_buffer(b);
        ctx.delete_vertex_array(vao);
        assert_eq!(ctx.live_objects(), 0);
    }

    #[test]
    fn buffer_data_requires_a_bound_buffer() {
        let ctx = HeadlessContext::new(4, 4);
        assert_eq!(ctx.buffer_data(&[0; 4], UsageType::StaticDraw), Err(GlError::INVALID_OPERATION));
        assert_eq!(ctx.take_errors(), vec![GlError::INVALID_OPERATION]);
        assert!(ctx.take_errors().is_empty());

        let buffer = ctx.create_buffer().unwrap();
        ctx.bind_array_buffer(Some(buffer));
        ctx.buffer_data(&[1, 2, 3], UsageType::StaticDraw).unwrap();
        assert_eq!(ctx.read_buffer(buffer).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn link_without_fragment_stage_fails() {
        let ctx = HeadlessContext::new(4, 4);
        let vertex = ctx.create_shader(ShaderType::Vertex).unwrap();
        ctx.shader_source(vertex, "#version 300 es\nvoid main() { gl_Position = vec4(0.0); }\n");
        ctx.compile_shader(vertex);
        assert!(ctx.shader_compile_status(vertex));

        let program = ctx.create_program().unwrap();
        ctx.attach_shader(program, vertex);
        ctx.link_program(program);
        assert!(!ctx.program_link_status(program));
        assert_eq!(ctx.program_info_log(program), "ERROR: No fragment shader attached.");
    }

    #[test]
    fn clear_fills_framebuffer() {
        let ctx = HeadlessContext::new(2, 2);
        ctx.clear_color(0.5, 0.0, 0.25, 1.0);
        ctx.clear();
        assert_eq!(ctx.framebuffer().pixel(1, 1), Some([0.5, 0.0, 0.25, 1.0]));
        assert_eq!(ctx.calls(), vec![Call::ClearColor([0.5, 0.0, 0.25, 1.0]), Call::Clear]);
    }

    #[test]
    fn framebuffer_is_a_snapshot() {
        let ctx = HeadlessContext::new(1, 1);
        let before = ctx.framebuffer();
        ctx.clear_color(1.0, 1.0, 1.0, 1.0);
        ctx.clear();
        assert_eq!(before.pixel(0, 0), Some([0.0; 4]));
        assert_eq!(ctx.framebuffer().pixel(0, 0), Some([1.0; 4]));
    }

    #[test]
    fn draw_without_state_is_recorded_not_fatal() {
        let ctx = HeadlessContext::new(2, 2);
        ctx.draw_arrays(Primitive::Triangles, 0, 3);
        assert_eq!(ctx.draw_calls(), 1);
        assert!(ctx.take_errors().is_empty());

        ctx.viewport(0, 0, 2, 2);
        ctx.draw_arrays(Primitive::Triangles, 0, 3);
        assert_eq!(ctx.draw_calls(), 2);
        assert_eq!(ctx.take_errors(), vec![GlError::INVALID_OPERATION]);
    }

    #[test]
    fn draw_range_past_i32_is_rejected() {
        let ctx = HeadlessContext::new(2, 2);
        ctx.viewport(0, 0, 2, 2);
        ctx.draw_arrays(Primitive::Triangles, i32::MAX - 1, 3);
        assert_eq!(ctx.draw_calls(), 1);
        assert_eq!(ctx.take_errors(), vec![GlError::INVALID_OPERATION]);
    }

    #[test]
    fn only_triangles_are_rasterized() {
        let ctx = HeadlessContext::new(2, 2);
        ctx.viewport(0, 0, 2, 2);
        for mode in [Primitive::Points, Primitive::Lines, Primitive::TriangleStrip] {
            ctx.draw_arrays(mode, 0, 3);
        }
        assert_eq!(ctx.draw_calls(), 3);
        assert!(ctx.take_errors().is_empty());
        assert_eq!(ctx.framebuffer().pixel(0, 0), Some([0.0; 4]));
    }

    #[test]
    fn usage_hint_is_recorded() {
        let ctx = HeadlessContext::new(1, 1);
        let buffer = ctx.create_buffer().unwrap();
        ctx.bind_array_buffer(Some(buffer));
        ctx.buffer_data(&[0; 8], UsageType::DynamicDraw).unwrap();
        ctx.buffer_data(&[0; 4], UsageType::StreamDraw).unwrap();

        let uploads: Vec<_> = ctx
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::BufferData { .. }))
            .collect();
        assert_eq!(
            uploads,
            [
                Call::BufferData { bytes: 8, usage: UsageType::DynamicDraw },
                Call::BufferData { bytes: 4, usage: UsageType::StreamDraw },
            ]
        );
    }
}
