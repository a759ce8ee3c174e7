//! Command Handlers 实现

mod generate_video_handler;
mod submit_video_handler;

pub use generate_video_handler::*;
pub use submit_video_handler::*;
