use font8x8::{BASIC_FONTS, UnicodeFonts};

use crate::card::ResultCard;
use crate::error::ExportError;
use crate::styles::CardStyle;

const GLYPH: u32 = 8;
const WHITE: u8 = 0xff;
const BLACK: u8 = 0x00;

struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![WHITE; (width * height) as usize],
        }
    }

    fn fill(&mut self, x: u32, y: u32, size: u32) {
        for py in y..(y + size).min(self.height) {
            for px in x..(x + size).min(self.width) {
                self.pixels[(py * self.width + px) as usize] = BLACK;
            }
        }
    }

    /// Draw `text` horizontally centred with its top edge at `y`.
    fn draw_centered(&mut self, text: &str, y: u32, scale: u32) {
        let advance = GLYPH * scale;
        let text_width = text_width(text, scale);
        let mut x = self.width.saturating_sub(text_width) / 2;

        for ch in text.chars() {
            if x + advance > self.width {
                break;
            }
            let glyph = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')).unwrap_or([0; 8]);
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH {
                    if bits & (1 << col) != 0 {
                        self.fill(x + col * scale, y + row as u32 * scale, scale);
                    }
                }
            }
            x += advance;
        }
    }
}

fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH * scale
}

fn line_height(scale: u32, spacing: f32) -> u32 {
    ((GLYPH * scale) as f32 * spacing).ceil() as u32
}

/// Render the card as an 8-bit grayscale PNG, black text on white.
pub fn render_png(card: &ResultCard, style: &CardStyle) -> Result<Vec<u8>, ExportError> {
    if card.title.is_empty() && card.lines.is_empty() {
        return Err(ExportError::Empty);
    }

    let widest = card
        .lines
        .iter()
        .map(|l| text_width(l, style.text_scale))
        .chain(std::iter::once(text_width(&card.title, style.title_scale)))
        .max()
        .unwrap_or(0);
    let width = (widest + widest * 5 / 100 + 2 * style.padding).clamp(1, style.max_width);

    let title_step = line_height(style.title_scale, style.spacing);
    let text_step = line_height(style.text_scale, style.spacing);
    let height = 2 * style.padding + title_step + text_step * card.lines.len() as u32;

    let mut canvas = Canvas::new(width, height);
    let mut y = style.padding;
    canvas.draw_centered(&card.title, y, style.title_scale);
    y += title_step;
    for line in &card.lines {
        canvas.draw_centered(line, y, style.text_scale);
        y += text_step;
    }

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, canvas.width, canvas.height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&canvas.pixels)?;
        writer.finish()?;
    }
    Ok(out)
}
