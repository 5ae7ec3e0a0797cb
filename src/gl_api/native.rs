//! [`GraphicsContext`] over the driver's function pointers.

use std::ffi::CString;
use std::marker::PhantomData;
use std::os::raw::c_void;

use gl::types::*;

use super::context::*;
use super::error::{GlError, GlResult};

/// A loaded OpenGL context.
///
/// GL function pointers are process-global but only valid on the thread whose
/// context is current, so this type is neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct NativeContext {
    _marker: PhantomData<*mut ()>,
}

impl NativeContext {
    /// Loads every entry point through `loader`. Returns `None` when the
    /// entry points the renderer depends on could not be resolved.
    pub fn load<F>(loader: F) -> Option<Self>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);

        let loaded = gl::CreateShader::is_loaded()
            && gl::CreateProgram::is_loaded()
            && gl::GenVertexArrays::is_loaded()
            && gl::DrawArrays::is_loaded();
        if !loaded {
            log::warn!("OpenGL entry points missing after load");
            return None;
        }

        unsafe {
            let version = gl::GetString(gl::VERSION);
            if !version.is_null() {
                let version = ::std::ffi::CStr::from_ptr(version as *const _);
                log::info!("OpenGL {}", version.to_string_lossy());
            }
        }

        Some(NativeContext { _marker: PhantomData })
    }
}

fn warn_on_error(op: &str, result: GlResult<()>) {
    if let Err(err) = result {
        log::warn!("{} failed: {}", op, err);
    }
}

fn shader_type(ty: ShaderType) -> GLenum {
    match ty {
        ShaderType::Vertex => gl::VERTEX_SHADER,
        ShaderType::Fragment => gl::FRAGMENT_SHADER,
    }
}

/// Reads an info log given the `*iv` and `*InfoLog` entry points for an
/// object kind.
unsafe fn info_log(
    id: GLuint,
    get_iv: unsafe fn(GLuint, GLenum, *mut GLint),
    get_log: unsafe fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar),
) -> String {
    let mut length = 0;
    get_iv(id, gl::INFO_LOG_LENGTH, &mut length);
    if length <= 0 {
        return String::new();
    }

    let mut buffer = vec![0u8; length as usize];
    let mut written = 0;
    get_log(id, length, &mut written, buffer.as_mut_ptr() as *mut GLchar);
    buffer.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buffer).into_owned()
}

impl GraphicsContext for NativeContext {
    fn create_shader(&self, ty: ShaderType) -> GlResult<ShaderId> {
        let id = unsafe { gl_call!(CreateShader(shader_type(ty)))? };
        ShaderId::from_raw(id).ok_or(GlError::ObjectCreation("shader"))
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        let ptr = source.as_ptr() as *const GLchar;
        let len = source.len() as GLint;
        unsafe {
            warn_on_error("glShaderSource", gl_call!(ShaderSource(shader.raw(), 1, &ptr, &len)));
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        unsafe {
            warn_on_error("glCompileShader", gl_call!(CompileShader(shader.raw())));
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        let mut status = 0;
        unsafe {
            warn_on_error(
                "glGetShaderiv",
                gl_call!(GetShaderiv(shader.raw(), gl::COMPILE_STATUS, &mut status)),
            );
        }
        status != 0
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        unsafe { info_log(shader.raw(), gl::GetShaderiv, gl::GetShaderInfoLog) }
    }

    fn delete_shader(&self, shader: ShaderId) {
        unsafe {
            warn_on_error("glDeleteShader", gl_call!(DeleteShader(shader.raw())));
        }
    }

    fn create_program(&self) -> GlResult<ProgramId> {
        let id = unsafe { gl_call!(CreateProgram())? };
        ProgramId::from_raw(id).ok_or(GlError::ObjectCreation("program"))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        unsafe {
            warn_on_error("glAttachShader", gl_call!(AttachShader(program.raw(), shader.raw())));
        }
    }

    fn link_program(&self, program: ProgramId) {
        unsafe {
            warn_on_error("glLinkProgram", gl_call!(LinkProgram(program.raw())));
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        let mut status = 0;
        unsafe {
            warn_on_error(
                "glGetProgramiv",
                gl_call!(GetProgramiv(program.raw(), gl::LINK_STATUS, &mut status)),
            );
        }
        status != 0
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        unsafe { info_log(program.raw(), gl::GetProgramiv, gl::GetProgramInfoLog) }
    }

    fn delete_program(&self, program: ProgramId) {
        unsafe {
            warn_on_error("glDeleteProgram", gl_call!(DeleteProgram(program.raw())));
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe {
            warn_on_error("glUseProgram", gl_call!(UseProgram(program.map_or(0, ProgramId::raw))));
        }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let c_name = CString::new(name).ok()?;
        let location =
            unsafe { gl_call!(GetAttribLocation(program.raw(), c_name.as_ptr())).ok()? };
        if location < 0 {
            None
        } else {
            Some(location as u32)
        }
    }

    fn create_buffer(&self) -> GlResult<BufferId> {
        let mut id = 0;
        unsafe {
            gl_call!(GenBuffers(1, &mut id))?;
        }
        BufferId::from_raw(id).ok_or(GlError::ObjectCreation("buffer"))
    }

    fn bind_array_buffer(&self, buffer: Option<BufferId>) {
        unsafe {
            warn_on_error(
                "glBindBuffer",
                gl_call!(BindBuffer(gl::ARRAY_BUFFER, buffer.map_or(0, BufferId::raw))),
            );
        }
    }

    fn buffer_data(&self, data: &[u8], usage: UsageType) -> GlResult<()> {
        // Could fail if OOM
        unsafe {
            gl_call!(BufferData(
                gl::ARRAY_BUFFER,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const _,
                usage as GLenum
            ))
        }
    }

    fn read_buffer(&self, buffer: BufferId) -> GlResult<Vec<u8>> {
        self.bind_array_buffer(Some(buffer));
        unsafe {
            let mut size = 0;
            gl_call!(GetBufferParameteriv(gl::ARRAY_BUFFER, gl::BUFFER_SIZE, &mut size))?;
            let mut data = vec![0u8; size.max(0) as usize];
            if !data.is_empty() {
                gl_call!(GetBufferSubData(
                    gl::ARRAY_BUFFER,
                    0,
                    data.len() as GLsizeiptr,
                    data.as_mut_ptr() as *mut _
                ))?;
            }
            Ok(data)
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let id = buffer.raw();
        unsafe {
            warn_on_error("glDeleteBuffers", gl_call!(DeleteBuffers(1, &id)));
        }
    }

    fn create_vertex_array(&self) -> GlResult<VertexArrayId> {
        let mut id = 0;
        unsafe {
            gl_call!(GenVertexArrays(1, &mut id))?;
        }
        VertexArrayId::from_raw(id).ok_or(GlError::ObjectCreation("vertex array"))
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayId>) {
        unsafe {
            warn_on_error(
                "glBindVertexArray",
                gl_call!(BindVertexArray(vao.map_or(0, VertexArrayId::raw))),
            );
        }
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        let id = vao.raw();
        unsafe {
            warn_on_error("glDeleteVertexArrays", gl_call!(DeleteVertexArrays(1, &id)));
        }
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        unsafe {
            warn_on_error("glEnableVertexAttribArray", gl_call!(EnableVertexAttribArray(location)));
        }
    }

    fn vertex_attrib_pointer_f32(&self, location: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            warn_on_error(
                "glVertexAttribPointer",
                gl_call!(VertexAttribPointer(
                    location,
                    components,
                    gl::FLOAT,
                    gl::FALSE,
                    stride,
                    offset as usize as *const c_void
                )),
            );
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe {
            warn_on_error("glViewport", gl_call!(Viewport(x, y, width, height)));
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe {
            warn_on_error("glClearColor", gl_call!(ClearColor(r, g, b, a)));
        }
    }

    fn clear(&self) {
        unsafe {
            warn_on_error("glClear", gl_call!(Clear(gl::COLOR_BUFFER_BIT)));
        }
    }

    fn draw_arrays(&self, mode: Primitive, first: i32, count: i32) {
        unsafe {
            warn_on_error("glDrawArrays", gl_call!(DrawArrays(mode as GLenum, first, count)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log;

    #[test]
    fn failed_calls_are_logged_as_warnings() {
        test_log::install();
        warn_on_error("glUseProgram", Err(GlError::INVALID_OPERATION));
        assert!(test_log::logged(log::Level::Warn, "glUseProgram failed: GL error 0x0502"));

        warn_on_error("glUseProgram", Ok(()));
        assert!(test_log::take().is_empty());
    }
}
