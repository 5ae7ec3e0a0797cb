#[macro_use]
pub mod gl_api;

pub mod config;
pub mod logging;
pub mod scene;
pub mod units;
pub mod window;

#[cfg(test)]
mod test_log;
