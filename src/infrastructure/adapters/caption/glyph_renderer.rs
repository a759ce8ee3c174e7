//! Glyph Caption Renderer - 基于 imageproc + ab_glyph 的字幕帧渲染
//!
//! 字幕帧：黑底白字，按词贪心折行（行宽不超过 width - margin），每行水平居中，整体垂直居中。
//! 结尾卡片：红底，粗体标题 + 半号副标题，左上角可选 logo。

use ab_glyph::{FontVec, PxScale};
use image::{imageops, DynamicImage, Rgb, RgbImage, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;

use crate::application::ports::{CaptionRendererPort, ClosingCard, FrameSize, RenderError};

/// 字幕帧样式
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    pub font_size: f32,
    pub line_height: u32,
    /// 左右留白之和，折行宽度为 width - margin
    pub margin: u32,
    pub background: [u8; 3],
    pub text_color: [u8; 3],
    pub closing_background: [u8; 3],
    pub closing_title_size: f32,
    pub logo_size: u32,
    pub logo_position: (i64, i64),
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 30.0,
            line_height: 40,
            margin: 60,
            background: [0, 0, 0],
            text_color: [255, 255, 255],
            closing_background: [255, 0, 0],
            closing_title_size: 60.0,
            logo_size: 100,
            logo_position: (20, 20),
        }
    }
}

/// 按词贪心折行
///
/// `measure` 返回一行文字的像素宽度。单个词超宽时独占一行。
pub fn wrap_lines<F>(text: &str, max_width: u32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> u32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub struct GlyphCaptionRenderer {
    font: FontVec,
    bold_font: Option<FontVec>,
    logo: Option<RgbaImage>,
    style: CaptionStyle,
}

impl GlyphCaptionRenderer {
    pub fn new(font: FontVec, style: CaptionStyle) -> Self {
        Self {
            font,
            bold_font: None,
            logo: None,
            style,
        }
    }

    /// 从字体文件创建；粗体文件缺失时标题使用常规字体
    pub fn from_font_files(
        regular: &Path,
        bold: Option<&Path>,
        style: CaptionStyle,
    ) -> Result<Self, RenderError> {
        let font = load_font(regular)?;
        let bold_font = match bold {
            Some(path) => match load_font(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Bold font unavailable, using regular font for titles"
                    );
                    None
                }
            },
            None => None,
        };

        tracing::info!(font = %regular.display(), "Caption renderer initialized");
        Ok(Self {
            font,
            bold_font,
            logo: None,
            style,
        })
    }

    pub fn with_logo(mut self, logo: RgbaImage) -> Self {
        let size = self.style.logo_size;
        self.logo = Some(if logo.dimensions() == (size, size) {
            logo
        } else {
            imageops::resize(&logo, size, size, imageops::FilterType::Lanczos3)
        });
        self
    }

    fn title_font(&self) -> &FontVec {
        self.bold_font.as_ref().unwrap_or(&self.font)
    }

    /// 在画布上绘制一组居中的文字块；blocks 为 (字体, 字号, 行高, 文本)
    fn draw_centered(&self, canvas: &mut RgbImage, blocks: &[(&FontVec, f32, u32, &str)]) {
        let (width, height) = canvas.dimensions();
        let max_width = width.saturating_sub(self.style.margin);
        let color = Rgb(self.style.text_color);

        let laid_out: Vec<(&FontVec, PxScale, u32, Vec<String>)> = blocks
            .iter()
            .map(|(font, size, line_height, text)| {
                let scale = PxScale::from(*size);
                let lines = wrap_lines(text, max_width, |line| text_size(scale, *font, line).0);
                (*font, scale, *line_height, lines)
            })
            .collect();

        let block_height: u32 = laid_out
            .iter()
            .map(|(_, _, line_height, lines)| line_height * lines.len() as u32)
            .sum();
        let mut y = (height.saturating_sub(block_height) / 2) as i32;

        for (font, scale, line_height, lines) in &laid_out {
            for line in lines {
                let (line_width, _) = text_size(*scale, *font, line);
                let x = (width.saturating_sub(line_width) / 2) as i32;
                draw_text_mut(canvas, color, x, y, *scale, *font, line);
                y += *line_height as i32;
            }
        }
    }
}

fn load_font(path: &Path) -> Result<FontVec, RenderError> {
    let data = std::fs::read(path)
        .map_err(|e| RenderError::Encode(format!("cannot read font {}: {}", path.display(), e)))?;
    FontVec::try_from_vec(data)
        .map_err(|e| RenderError::Encode(format!("invalid font {}: {}", path.display(), e)))
}

impl CaptionRendererPort for GlyphCaptionRenderer {
    fn render_caption(&self, text: &str, size: FrameSize) -> Option<RgbImage> {
        if size.width == 0 || size.height == 0 || text.trim().is_empty() {
            return None;
        }

        let mut canvas = RgbImage::from_pixel(size.width, size.height, Rgb(self.style.background));
        self.draw_centered(
            &mut canvas,
            &[(
                &self.font,
                self.style.font_size,
                self.style.line_height,
                text,
            )],
        );
        Some(canvas)
    }

    fn render_closing(&self, card: &ClosingCard, size: FrameSize) -> Option<RgbImage> {
        if size.width == 0 || size.height == 0 {
            return None;
        }

        let title_size = self.style.closing_title_size;
        let subtitle_size = title_size / 2.0;
        let mut canvas = RgbImage::from_pixel(
            size.width,
            size.height,
            Rgb(self.style.closing_background),
        );
        self.draw_centered(
            &mut canvas,
            &[
                (
                    self.title_font(),
                    title_size,
                    (title_size * 1.25) as u32,
                    card.title.as_str(),
                ),
                (
                    &self.font,
                    subtitle_size,
                    (subtitle_size * 1.5) as u32,
                    card.subtitle.as_str(),
                ),
            ],
        );

        match &self.logo {
            Some(logo) => {
                let mut rgba = DynamicImage::ImageRgb8(canvas).to_rgba8();
                let (x, y) = self.style.logo_position;
                imageops::overlay(&mut rgba, logo, x, y);
                Some(DynamicImage::ImageRgba8(rgba).to_rgb8())
            }
            None => Some(canvas),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT_CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ];

    fn system_font() -> Option<GlyphCaptionRenderer> {
        FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .and_then(|p| GlyphCaptionRenderer::from_font_files(p, None, CaptionStyle::default()).ok())
    }

    /// 每个字符 10 像素
    fn fixed_width(line: &str) -> u32 {
        line.chars().count() as u32 * 10
    }

    #[test]
    fn test_wrap_lines_greedy() {
        let lines = wrap_lines("uno dos tres cuatro cinco", 100, fixed_width);
        assert_eq!(lines, vec!["uno dos", "tres", "cuatro", "cinco"]);
    }

    #[test]
    fn test_wrap_lines_never_exceeds_width_except_long_words() {
        let text = "la noche era oscura y el viento soplaba entre los arboles antiguos";
        let lines = wrap_lines(text, 120, fixed_width);
        for line in &lines {
            assert!(fixed_width(line) <= 120 || !line.contains(' '));
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_lines_long_word_alone() {
        let lines = wrap_lines("a supercalifragilistico b", 50, fixed_width);
        assert_eq!(lines, vec!["a", "supercalifragilistico", "b"]);
    }

    #[test]
    fn test_render_caption_dimensions() {
        let Some(renderer) = system_font() else {
            return;
        };
        let frame = renderer
            .render_caption("Había una vez una casa abandonada.", FrameSize::default())
            .unwrap();

        assert_eq!(frame.dimensions(), (1280, 320));
        assert_eq!(frame.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert!(frame.pixels().any(|p| p.0[0] > 128));
    }

    #[test]
    fn test_render_closing_with_logo() {
        let Some(renderer) = system_font() else {
            return;
        };
        let logo = RgbaImage::from_pixel(100, 100, image::Rgba([0, 255, 0, 255]));
        let renderer = renderer.with_logo(logo);

        let frame = renderer
            .render_closing(&ClosingCard::default(), FrameSize::default())
            .unwrap();

        assert_eq!(frame.get_pixel(5, 5), &Rgb([255, 0, 0]));
        assert_eq!(frame.get_pixel(70, 70), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_empty_frame_size_yields_none() {
        let Some(renderer) = system_font() else {
            return;
        };
        let size = FrameSize {
            width: 0,
            height: 320,
        };
        assert!(renderer.render_caption("hola", size).is_none());
    }
}
