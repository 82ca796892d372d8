// 该文件是 Kanjian （看见） 项目的一部分。
// src/render.rs - 检测框绘制
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{
  color::ClassColor,
  convert::{BoxYxyx, RenderBox},
  frame::{ChwImage, PixelRange},
  visualize::VisualizeError,
};

pub const DEFAULT_THICKNESS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxRenderer {
  thickness: u32,
  range: PixelRange,
}

impl Default for BoxRenderer {
  fn default() -> Self {
    Self {
      thickness: DEFAULT_THICKNESS,
      range: PixelRange::default(),
    }
  }
}

/// 像素坐标下的闭区间矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
  left: i32,
  top: i32,
  right: i32,
  bottom: i32,
}

impl PixelRect {
  // 按 [H, W, H, W] 反归一化，角点顺序不定时取 min/max
  fn from_yxyx(bbox: &BoxYxyx, height: usize, width: usize) -> Self {
    let [y1, x1, y2, x2] = bbox.0;
    let (h, w) = (height as f32, width as f32);
    let to_px = |v: f32, size: f32, limit: usize| {
      ((v * size).floor() as i32).clamp(0, limit.saturating_sub(1) as i32)
    };

    let (ya, yb) = (to_px(y1, h, height), to_px(y2, h, height));
    let (xa, xb) = (to_px(x1, w, width), to_px(x2, w, width));

    Self {
      left: xa.min(xb),
      top: ya.min(yb),
      right: xa.max(xb),
      bottom: ya.max(yb),
    }
  }

  fn inset(&self, by: i32) -> Option<Self> {
    let rect = Self {
      left: self.left + by,
      top: self.top + by,
      right: self.right - by,
      bottom: self.bottom - by,
    };
    (rect.left <= rect.right && rect.top <= rect.bottom).then_some(rect)
  }

  fn to_rect(self) -> Rect {
    Rect::at(self.left, self.top).of_size(
      (self.right - self.left + 1) as u32,
      (self.bottom - self.top + 1) as u32,
    )
  }
}

impl BoxRenderer {
  pub fn new(thickness: u32, range: PixelRange) -> Self {
    Self {
      thickness: thickness.max(1),
      range,
    }
  }

  pub fn thickness(&self) -> u32 {
    self.thickness
  }

  pub fn range(&self) -> PixelRange {
    self.range
  }

  /// 在图像副本上按列表顺序绘制检测框，后绘制的边框覆盖先绘制的
  pub fn render(
    &self,
    image: &ChwImage,
    boxes: &[RenderBox],
    colors: &ClassColor,
  ) -> Result<ChwImage, VisualizeError> {
    // 先查完颜色，避免绘制到一半才失败
    let colored = boxes
      .iter()
      .map(|b| {
        colors
          .get(b.class_id)
          .map(|color| (b, self.range.scale_color(color)))
      })
      .collect::<Result<Vec<_>, VisualizeError>>()?;

    let (height, width) = (image.height(), image.width());
    if height == 0 || width == 0 || colored.is_empty() {
      return Ok(image.clone());
    }

    let mut canvas = image.to_rgb32f();
    for (b, color) in colored {
      let outer = PixelRect::from_yxyx(&b.bbox, height, width);
      for t in 0..self.thickness as i32 {
        let Some(rect) = outer.inset(t) else {
          break;
        };
        draw_hollow_rect_mut(&mut canvas, rect.to_rect(), color);
      }
    }

    Ok(ChwImage::from_rgb32f(&canvas))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::Array3;

  fn blank(height: usize, width: usize) -> ChwImage {
    ChwImage::new(Array3::zeros((3, height, width))).unwrap()
  }

  fn red_and_green() -> ClassColor {
    ClassColor::from_colors(vec![[0, 0, 0], [255, 0, 0], [0, 255, 0]])
  }

  fn pixel(image: &ChwImage, x: usize, y: usize) -> [f32; 3] {
    let d = image.data();
    [d[[0, y, x]], d[[1, y, x]], d[[2, y, x]]]
  }

  #[test]
  fn draws_outline_in_class_color() {
    let image = blank(10, 10);
    let boxes = [RenderBox {
      class_id: 1,
      bbox: BoxYxyx([0.2, 0.2, 0.6, 0.6]),
    }];
    let out = BoxRenderer::new(1, PixelRange::Unit)
      .render(&image, &boxes, &red_and_green())
      .unwrap();

    assert_eq!(out.shape(), (3, 10, 10));
    assert_eq!(pixel(&out, 2, 2), [1.0, 0.0, 0.0]);
    assert_eq!(pixel(&out, 6, 4), [1.0, 0.0, 0.0]);
    assert_eq!(pixel(&out, 4, 6), [1.0, 0.0, 0.0]);
    assert_eq!(pixel(&out, 4, 4), [0.0, 0.0, 0.0]);
    // 原图不变
    assert_eq!(pixel(&image, 2, 2), [0.0, 0.0, 0.0]);
  }

  #[test]
  fn uses_yx_order_for_denormalization() {
    let image = blank(10, 20);
    // y 在 [0.0, 0.5]，x 在 [0.5, 1.0)
    let boxes = [RenderBox {
      class_id: 2,
      bbox: BoxYxyx([0.0, 0.5, 0.5, 0.99]),
    }];
    let out = BoxRenderer::new(1, PixelRange::Unit)
      .render(&image, &boxes, &red_and_green())
      .unwrap();
    assert_eq!(pixel(&out, 10, 0), [0.0, 1.0, 0.0]);
    assert_eq!(pixel(&out, 19, 5), [0.0, 1.0, 0.0]);
    assert_eq!(pixel(&out, 5, 0), [0.0, 0.0, 0.0]);
  }

  #[test]
  fn later_boxes_overwrite_shared_edges() {
    let image = blank(10, 10);
    let bbox = BoxYxyx([0.1, 0.1, 0.8, 0.8]);
    let boxes = [
      RenderBox { class_id: 1, bbox },
      RenderBox { class_id: 2, bbox },
    ];
    let out = BoxRenderer::default()
      .render(&image, &boxes, &red_and_green())
      .unwrap();
    assert_eq!(pixel(&out, 1, 1), [0.0, 1.0, 0.0]);
    assert_eq!(pixel(&out, 2, 2), [0.0, 1.0, 0.0]);
  }

  #[test]
  fn byte_range_scales_colors() {
    let image = blank(8, 8);
    let boxes = [RenderBox {
      class_id: 1,
      bbox: BoxYxyx([0.0, 0.0, 0.5, 0.5]),
    }];
    let out = BoxRenderer::new(1, PixelRange::Byte)
      .render(&image, &boxes, &red_and_green())
      .unwrap();
    assert_eq!(pixel(&out, 0, 0), [255.0, 0.0, 0.0]);
  }

  #[test]
  fn unknown_class_fails_without_drawing() {
    let image = blank(8, 8);
    let boxes = [RenderBox {
      class_id: 7,
      bbox: BoxYxyx([0.0, 0.0, 0.5, 0.5]),
    }];
    let err = BoxRenderer::default()
      .render(&image, &boxes, &red_and_green())
      .unwrap_err();
    assert!(matches!(
      err,
      VisualizeError::ColorLookup {
        class_id: 7,
        num_classes: 3
      }
    ));
  }

  #[test]
  fn degenerate_box_still_marks_a_pixel() {
    let image = blank(10, 10);
    let boxes = [RenderBox {
      class_id: 1,
      bbox: BoxYxyx([0.5, 0.99, 0.5, 0.6]),
    }];
    let out = BoxRenderer::default()
      .render(&image, &boxes, &red_and_green())
      .unwrap();
    assert_eq!(pixel(&out, 6, 5), [1.0, 0.0, 0.0]);
    assert_eq!(pixel(&out, 9, 5), [1.0, 0.0, 0.0]);
  }

  #[test]
  fn rendering_is_deterministic() {
    let image = ChwImage::new(Array3::from_shape_fn((3, 16, 16), |(c, y, x)| {
      ((c + y * x) % 7) as f32 / 7.0
    }))
    .unwrap();
    let boxes = [
      RenderBox {
        class_id: 1,
        bbox: BoxYxyx([0.1, 0.2, 0.7, 0.9]),
      },
      RenderBox {
        class_id: 2,
        bbox: BoxYxyx([0.3, 0.0, 0.99, 0.4]),
      },
    ];
    let renderer = BoxRenderer::default();
    let colors = ClassColor::seeded(3, 0);
    let a = renderer.render(&image, &boxes, &colors).unwrap();
    let b = renderer.render(&image, &boxes, &colors).unwrap();
    let bits = |img: &ChwImage| img.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a), bits(&b));
  }
}
