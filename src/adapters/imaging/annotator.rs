use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::application::ports::AnnotatorPort;
use crate::domain::detection::Detection;
use crate::domain::errors::DomainResult;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 2;
/// Distancia vertical entre la etiqueta y la esquina superior de la caja.
const LABEL_OFFSET: i32 = 10;
const LABEL_SCALE: f32 = 12.0;

/// Fuente para las etiquetas: TrueType si se configuró una, si no el bitmap 8x8 interno.
pub enum LabelFont {
    TrueType(FontArc),
    Bitmap,
}

pub struct ImageAnnotator {
    font: LabelFont,
}

impl ImageAnnotator {
    pub fn new(font: LabelFont) -> Self {
        Self { font }
    }

    pub fn with_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("no se pudo leer la fuente {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .with_context(|| format!("fuente inválida: {}", path.display()))?;
        Ok(Self::new(LabelFont::TrueType(font)))
    }

    fn draw_box(&self, canvas: &mut RgbImage, [x1, y1, x2, y2]: [i32; 4]) {
        for t in 0..BOX_THICKNESS {
            let w = x2 - x1 + 1 - 2 * t;
            let h = y2 - y1 + 1 - 2 * t;
            if w <= 0 || h <= 0 {
                break;
            }
            draw_hollow_rect_mut(canvas, Rect::at(x1 + t, y1 + t).of_size(w as u32, h as u32), BOX_COLOR);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str) {
        match &self.font {
            LabelFont::TrueType(font) => {
                draw_text_mut(canvas, BOX_COLOR, x, y, PxScale::from(LABEL_SCALE), font, text)
            }
            LabelFont::Bitmap => draw_bitmap_text(canvas, x, y, text),
        }
    }
}

impl Default for ImageAnnotator {
    fn default() -> Self {
        Self::new(LabelFont::Bitmap)
    }
}

impl AnnotatorPort for ImageAnnotator {
    fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> DomainResult<RgbImage> {
        let mut canvas = image.clone();
        for det in detections {
            self.draw_box(&mut canvas, det.bbox);
            let [x1, y1, ..] = det.bbox;
            let label = format!("{} {:.2}", det.label, det.confidence);
            self.draw_label(&mut canvas, x1.max(0), (y1 - LABEL_OFFSET).max(0), &label);
        }
        Ok(canvas)
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, x: i32, y: i32, text: &str) {
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = x + 8 * i as i32;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8 {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let (px, py) = (origin_x + col, y + row as i32);
                if (0..width).contains(&px) && (0..height).contains(&py) {
                    canvas.put_pixel(px as u32, py as u32, BOX_COLOR);
                }
            }
        }
    }
}
