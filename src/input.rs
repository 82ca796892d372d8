// 该文件是 Kanjian （看见） 项目的一部分。
// src/input.rs - 图像批次输入
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

use std::path::PathBuf;

use ndarray::{Array4, Axis};

mod image_folder;
pub use self::image_folder::{ImageFolderBatches, ImageFolderInput, ImageFolderInputError, SquareMode};

/// 一个批次的图像，像素为 (B, C, H, W)
#[derive(Debug, Clone)]
pub struct ImageBatch {
  pub paths: Vec<PathBuf>,
  pub pixels: Array4<f32>,
}

impl ImageBatch {
  pub fn len(&self) -> usize {
    self.pixels.len_of(Axis(0))
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// 不含目录的文件名
  pub fn file_names(&self) -> Vec<String> {
    self
      .paths
      .iter()
      .map(|p| {
        p.file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default()
      })
      .collect()
  }
}
