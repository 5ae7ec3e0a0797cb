#[macro_use]
pub mod error;
#[macro_use]
pub mod layout;

pub mod buffer;
pub mod context;
pub mod headless;
pub mod native;
pub mod shader;
pub mod vertex_array;
