//! HTTP Handlers

mod ping;
mod video;
mod voice;

pub use ping::*;
pub use video::*;
pub use voice::*;
