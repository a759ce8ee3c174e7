//! Caption Adapter - 字幕帧光栅化

mod glyph_renderer;
mod logo;

pub use glyph_renderer::{wrap_lines, CaptionStyle, GlyphCaptionRenderer};
pub use logo::fetch_logo;
