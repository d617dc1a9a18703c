use serde::{Deserialize, Serialize};

/// Layout of the rendered card. Glyphs are 8x8 pixels before scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardStyle {
    /// Pixel multiplier for body lines.
    pub text_scale: u32,

    /// Pixel multiplier for the title.
    pub title_scale: u32,

    /// Line height as a multiple of the glyph height.
    pub spacing: f32,

    /// Blank border around the content, in pixels.
    pub padding: u32,

    /// The card is never wider than this.
    pub max_width: u32,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            text_scale: 2,
            title_scale: 3,
            spacing: 1.5,
            padding: 10,
            max_width: 1080,
        }
    }
}
