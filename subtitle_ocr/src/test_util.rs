//! Test-only utilities.

use image::Rgba;

use crate::pixmap::Pixmap;

/// Construct an RGBA color.
pub fn rgba_hex(hex: u32) -> Rgba<u8> {
    Rgba([
        // 'as' is safe here because we know this can't overflow.
        ((hex & 0xff000000) >> 24) as u8,
        ((hex & 0x00ff0000) >> 16) as u8,
        ((hex & 0x0000ff00) >> 8) as u8,
        (hex & 0x000000ff) as u8,
    ])
}

#[test]
fn rgba_hex_contructs_rbga_color() {
    assert_eq!(rgba_hex(0xf0f0f0ff), Rgba([240, 240, 240, 255]));
}

/// Fill a `w` by `h` box at `x`, `y` with full-intensity ink.
pub fn draw_box(img: &mut Pixmap<u8>, x: i32, y: i32, w: i32, h: i32) {
    for j in y..y + h {
        for i in x..x + w {
            img.set(i, j, 255);
        }
    }
}

/// Draw a 4-pixel-wide bar from row `y1` down to row `y2`, whose bottom
/// starts at column `x` and which leans right by `angle` columns per row.
pub fn draw_slanted_bar(img: &mut Pixmap<u8>, x: i32, y1: i32, y2: i32, angle: f64) {
    for y in y1..y2 {
        let left = x + (f64::from(y2 - y) * angle) as i32;
        draw_box(img, left, y, 4, 1);
    }
}

/// Build a pixmap from rows of text, where `#` is ink and anything else is
/// background.
pub fn pixmap_from_rows(rows: &[&str]) -> Pixmap<u8> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut img = Pixmap::blank(width, rows.len());
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            if c == '#' {
                *img.get_mut(x, y) = 255;
            }
        }
    }
    img
}

#[test]
fn pixmap_from_rows_marks_ink() {
    let img = pixmap_from_rows(&["#.", ".#"]);
    assert_eq!(img.data(), &[255, 0, 0, 255]);
}
