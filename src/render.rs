//! 检测框渲染 (Detection overlay)
//!
//! Draws a hollow rectangle and a "{label}: {confidence}" tag at the box
//! top-left for every detection, in the order provided.

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect as PixelRect;

use crate::error::DetectError;
use crate::labels::LabelTable;
use crate::Detection;

const BORDER_THICKNESS: i32 = 2;

// 明亮色板 (bright palette, cycled per class id)
const BRIGHT_COLORS: [(u8, u8, u8); 12] = [
    (255, 0, 0),     // 红色
    (0, 255, 0),     // 绿色
    (0, 0, 255),     // 蓝色
    (255, 255, 0),   // 黄色
    (255, 0, 255),   // 品红
    (0, 255, 255),   // 青色
    (255, 128, 0),   // 橙色
    (255, 0, 128),   // 粉红
    (128, 255, 0),   // 黄绿
    (0, 128, 255),   // 天蓝
    (255, 255, 255), // 白色
    (128, 0, 255),   // 紫色
];

pub struct Renderer {
    font: FontVec,
    font_scale: PxScale,
}

impl Renderer {
    pub fn new(font_bytes: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(font_bytes).map_err(|e| anyhow!("bad font data: {e}"))?;
        Ok(Self {
            font,
            font_scale: PxScale::from(24.0),
        })
    }

    /// Draws every detection onto `image`. Fails only when a class id has
    /// no label entry.
    pub fn draw(
        &self,
        image: &mut RgbImage,
        detections: &[Detection],
        labels: &LabelTable,
    ) -> Result<(), DetectError> {
        for det in detections {
            let label = labels.get(det.class_id())?;
            let color = color_for_class(det.class_id());
            let rect = det.rect();

            if rect.width() > 0 && rect.height() > 0 {
                for inset in 0..BORDER_THICKNESS {
                    let w = rect.width() - 2 * inset;
                    let h = rect.height() - 2 * inset;
                    if w <= 0 || h <= 0 {
                        break;
                    }
                    draw_hollow_rect_mut(
                        image,
                        PixelRect::at(rect.left() + inset, rect.top() + inset)
                            .of_size(w as u32, h as u32),
                        Rgb([color.0, color.1, color.2]),
                    );
                }
            }

            let text = label_text(label, det.confidence());
            draw_text_mut(
                image,
                Rgb([color.0, color.1, color.2]),
                rect.left().max(0),
                rect.top().max(0),
                self.font_scale,
                &self.font,
                &text,
            );
        }
        Ok(())
    }
}

pub fn label_text(label: &str, confidence: f32) -> String {
    format!("{}: {}", label, confidence)
}

pub fn color_for_class(class_id: usize) -> (u8, u8, u8) {
    BRIGHT_COLORS[class_id % BRIGHT_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_text_format() {
        assert_eq!(label_text("person", 0.875), "person: 0.875");
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(color_for_class(0), color_for_class(12));
        assert_ne!(color_for_class(0), color_for_class(1));
    }
}
