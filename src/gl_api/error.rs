use gl::types::GLenum;
use thiserror::Error;

pub type GlResult<T> = Result<T, GlError>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Error)]
pub enum GlError {
    #[error("GL error 0x{code:04X} ({})", code_name(.code))]
    Code { code: GLenum },
    #[error("failed to create {0} object")]
    ObjectCreation(&'static str),
}

impl GlError {
    pub const INVALID_ENUM: GlError = GlError::Code { code: gl::INVALID_ENUM };
    pub const INVALID_VALUE: GlError = GlError::Code { code: gl::INVALID_VALUE };
    pub const INVALID_OPERATION: GlError = GlError::Code { code: gl::INVALID_OPERATION };

    fn get_raw() -> GLenum {
        unsafe { gl::GetError() }
    }

    /// Checks the native error flag after a call has been issued, passing the
    /// call's return value through when the flag is clear.
    pub fn map_value<T>(val: T) -> GlResult<T> {
        match Self::get_raw() {
            0 => Ok(val),
            // GL specification states that it is undefined to issue any GL
            // calls after an out of memory error is received.
            gl::OUT_OF_MEMORY => ::std::process::abort(),
            code => Err(GlError::Code { code }),
        }
    }

    pub fn code(&self) -> Option<GLenum> {
        match *self {
            GlError::Code { code } => Some(code),
            GlError::ObjectCreation(_) => None,
        }
    }
}

fn code_name(code: &GLenum) -> &'static str {
    match *code {
        gl::INVALID_ENUM => "INVALID_ENUM",
        gl::INVALID_VALUE => "INVALID_VALUE",
        gl::INVALID_OPERATION => "INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "OUT_OF_MEMORY",
        gl::STACK_UNDERFLOW => "STACK_UNDERFLOW",
        gl::STACK_OVERFLOW => "STACK_OVERFLOW",
        _ => "unknown",
    }
}

macro_rules! gl_call {
    ($name:ident($($args:expr),*)) => {{
        $crate::gl_api::error::GlError::map_value(::gl::$name($($args),*))
    }}
}
