use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;

use crate::classifier::ClassificationResult;
use crate::models::DetectedCircle;

const OUTLINE: Rgb<u8> = Rgb([255, 0, 0]);
const MATCHED: Rgb<u8> = Rgb([0, 200, 0]);
const LABEL: Rgb<u8> = Rgb([255, 255, 0]);
const BANNER: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT: Rgb<u8> = Rgb([0, 0, 0]);

const LABEL_SCALE: u32 = 2;
const TOTAL_SCALE: u32 = 3;

/// Draw detected circles and the classification onto a copy of `frame`.
///
/// Every circle gets a red rim and centre dot. Circles counted as a coin get
/// an extra green ring per matched denomination and their value written
/// below the centre. The white banner at the top left carries the total.
pub fn annotate(frame: &DynamicImage, circles: &[DetectedCircle], result: &ClassificationResult) -> RgbImage {
    let mut canvas = frame.to_rgb8();

    for (index, circle) in circles.iter().enumerate() {
        let center = (circle.x.round() as i32, circle.y.round() as i32);
        let radius = circle.radius.round() as i32;

        draw_hollow_circle_mut(&mut canvas, center, radius, OUTLINE);
        draw_hollow_circle_mut(&mut canvas, center, radius - 1, OUTLINE);
        draw_filled_circle_mut(&mut canvas, center, 2, OUTLINE);

        let values = result.values_for(index);
        for ring in 0..values.len() as i32 {
            draw_hollow_circle_mut(&mut canvas, center, radius - 4 - 3 * ring, MATCHED);
        }

        if !values.is_empty() {
            let label = values.iter().map(|v| format!("{:.2}", v)).collect::<Vec<_>>().join("+");
            let x = center.0 - (text_width(&label, LABEL_SCALE) / 2) as i32;
            draw_text(&mut canvas, x, center.1 + 6, &label, LABEL_SCALE, LABEL);
        }
    }

    draw_total_banner(&mut canvas, result.total);
    canvas
}

fn draw_total_banner(canvas: &mut RgbImage, total: f64) {
    const TOP: u32 = 20;
    const HEIGHT: u32 = 35;
    if canvas.width() == 0 || canvas.height() < TOP + HEIGHT {
        return;
    }

    let text = format!("{:.2}", total);
    let width = text_width(&text, TOTAL_SCALE).saturating_add(10).max(150).min(canvas.width());
    draw_filled_rect_mut(canvas, Rect::at(0, TOP as i32).of_size(width, HEIGHT), BANNER);
    draw_text(canvas, 5, (TOP + 10) as i32, &text, TOTAL_SCALE, TEXT);
}

/// 3x5 bitmap glyphs, one byte per row, high bit on the left
fn glyph(ch: char) -> Option<[u8; 5]> {
    let rows = match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        _ => return None,
    };
    Some(rows)
}

fn text_width(text: &str, scale: u32) -> u32 {
    let chars = text.chars().count() as u32;
    chars.saturating_mul(4 * scale).saturating_sub(scale)
}

/// Write `text` with its top left corner at (x, y). Characters without a
/// glyph leave a gap. Drawing stops at the right edge of the canvas.
fn draw_text(canvas: &mut RgbImage, x: i32, y: i32, text: &str, scale: u32, color: Rgb<u8>) {
    let advance = 4 * scale as i32;
    let right_edge = canvas.width() as i32;

    for (i, ch) in text.chars().enumerate() {
        let left = x.saturating_add((i as i32).saturating_mul(advance));
        if left >= right_edge {
            break;
        }
        let Some(rows) = glyph(ch) else {
            continue;
        };
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..3 {
                if (bits >> (2 - col)) & 1 == 1 {
                    let px = left + col * scale as i32;
                    let py = y + row as i32 * scale as i32;
                    draw_filled_rect_mut(canvas, Rect::at(px, py).of_size(scale, scale), color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::CoinMatch;

    fn five_cents(total: f64) -> ClassificationResult {
        ClassificationResult {
            total,
            values: vec![0.05],
            matches: vec![CoinMatch {
                circle_index: 0,
                denomination: "5_cents".into(),
                value: 0.05,
                observed_ratio: 1.29,
                deviation: 0.0,
            }],
        }
    }

    #[test]
    fn test_annotate_marks_circles() {
        let frame = DynamicImage::new_rgb8(300, 300);
        let circles = vec![DetectedCircle::new(150.0, 150.0, 100.0)];

        let out = annotate(&frame, &circles, &five_cents(0.05));
        assert_eq!(out.dimensions(), (300, 300));
        // rim, centre, and inner match ring
        assert_eq!(*out.get_pixel(250, 150), OUTLINE);
        assert_eq!(*out.get_pixel(150, 150), OUTLINE);
        assert_eq!(*out.get_pixel(246, 150), MATCHED);
        // banner
        assert_eq!(*out.get_pixel(140, 50), BANNER);
    }

    #[test]
    fn test_values_written_as_text() {
        let frame = DynamicImage::new_rgb8(300, 300);
        let circles = vec![DetectedCircle::new(150.0, 150.0, 100.0)];
        let out = annotate(&frame, &circles, &five_cents(0.05));

        // "0.05" label is 30px wide, centred under the centre dot
        assert_eq!(*out.get_pixel(135, 156), LABEL);
        assert_eq!(*out.get_pixel(137, 158), Rgb([0, 0, 0]));
        // total starts with the top row of "0" in the banner
        assert_eq!(*out.get_pixel(5, 30), TEXT);
        assert_eq!(*out.get_pixel(8, 33), BANNER);
    }

    #[test]
    fn test_unmatched_circle_has_no_label() {
        let frame = DynamicImage::new_rgb8(300, 300);
        let circles = vec![DetectedCircle::new(150.0, 150.0, 100.0)];
        let out = annotate(&frame, &circles, &ClassificationResult::default());
        assert!(!out.pixels().any(|p| *p == LABEL));
    }

    #[test]
    fn test_large_total_is_clipped_to_canvas() {
        let frame = DynamicImage::new_rgb8(120, 80);
        let circles = vec![DetectedCircle::new(60.0, 40.0, 30.0)];

        let out = annotate(&frame, &circles, &five_cents(500_000_000.0));
        assert_eq!(out.dimensions(), (120, 80));
        assert_eq!(*out.get_pixel(119, 21), BANNER);
        assert_eq!(*out.get_pixel(5, 30), TEXT);

        let out = annotate(&frame, &circles, &five_cents(f64::MAX));
        assert_eq!(out.dimensions(), (120, 80));
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("0.05", 2), 30);
        assert_eq!(text_width("", 2), 0);
    }
}
