// 该文件是 Kanjian （看见） 项目的一部分。
// src/color.rs - 类别颜色映射
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

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::visualize::VisualizeError;

/// 类别到 RGB 颜色的映射，在运行开始时构建一次，之后只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassColor {
  colors: Vec<[u8; 3]>,
}

impl ClassColor {
  pub fn from_colors(colors: Vec<[u8; 3]>) -> Self {
    Self { colors }
  }

  /// 在色相环上均匀取色
  pub fn palette(num_classes: usize) -> Self {
    let colors = (0..num_classes)
      .map(|i| {
        let hue = (i as f32 / num_classes.max(1) as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();
    Self { colors }
  }

  /// 由随机种子生成颜色，同一种子总是得到同一映射
  pub fn seeded(num_classes: usize, seed: u64) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let colors = (0..num_classes).map(|_| rng.r#gen::<[u8; 3]>()).collect();
    Self { colors }
  }

  pub fn num_classes(&self) -> usize {
    self.colors.len()
  }

  pub fn get(&self, class_id: usize) -> Result<[u8; 3], VisualizeError> {
    self
      .colors
      .get(class_id)
      .copied()
      .ok_or(VisualizeError::ColorLookup {
        class_id,
        num_classes: self.colors.len(),
      })
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  [
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn palette_has_one_color_per_class() {
    let colors = ClassColor::palette(21);
    assert_eq!(colors.num_classes(), 21);
    assert_eq!(colors.get(0).unwrap(), hsv_to_rgb(0.0, 0.8, 0.9));
    assert_ne!(colors.get(1).unwrap(), colors.get(2).unwrap());
  }

  #[test]
  fn seeded_colors_are_reproducible() {
    assert_eq!(ClassColor::seeded(10, 42), ClassColor::seeded(10, 42));
    assert_ne!(ClassColor::seeded(10, 42), ClassColor::seeded(10, 7));
  }

  #[test]
  fn unknown_class_is_an_error() {
    let colors = ClassColor::from_colors(vec![[0, 0, 0], [255, 0, 0]]);
    assert_eq!(colors.get(1).unwrap(), [255, 0, 0]);
    let err = colors.get(2).unwrap_err();
    assert!(matches!(
      err,
      VisualizeError::ColorLookup {
        class_id: 2,
        num_classes: 2
      }
    ));
  }
}
