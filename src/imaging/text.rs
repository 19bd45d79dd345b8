//! Bitmap caption rendering with the public-domain 8×8 font.
//!
//! Used only by the error placeholder, which must render without any font
//! files being present on the host.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};

const GLYPH_SIZE: i32 = 8;

/// Pixel width of `text` at the given integer scale.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE as u32 * scale.max(1)
}

/// Draw `text` horizontally centered on `center_x`, with its top edge at `top`.
///
/// `bold` strikes every glyph twice, one pixel apart.
pub fn draw_centered(
    img: &mut RgbaImage,
    center_x: i32,
    top: i32,
    text: &str,
    color: Rgba<u8>,
    scale: u32,
    bold: bool,
) {
    let left = center_x - text_width(text, scale) as i32 / 2;
    draw_text(img, left, top, text, color, scale);
    if bold {
        draw_text(img, left + 1, top, text, color, scale);
    }
}

fn draw_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32) {
    let scale = scale.max(1) as i32;
    let mut cursor_x = x;
    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += GLYPH_SIZE * scale;
            continue;
        };
        for (row_idx, row_bits) in glyph.iter().enumerate() {
            for col_idx in 0..GLYPH_SIZE {
                if (row_bits >> col_idx) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col_idx * scale;
                let py = y + row_idx as i32 * scale;
                fill_block(img, px, py, scale, color);
            }
        }
        cursor_x += GLYPH_SIZE * scale;
    }
}

fn fill_block(img: &mut RgbaImage, x: i32, y: i32, size: i32, color: Rgba<u8>) {
    for ty in y..y + size {
        for tx in x..x + size {
            if tx >= 0 && ty >= 0 && tx < img.width() as i32 && ty < img.height() as i32 {
                img.put_pixel(tx as u32, ty as u32, color);
            }
        }
    }
}
