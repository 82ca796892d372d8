// 该文件是 Kanjian （看见） 项目的一部分。
// src/output.rs - 可视化结果输出
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

use crate::compose::VisualizationBatch;

/// 记录一批可视化图像，`step` 用于在日志流中关联批次
pub trait SummaryWriter {
  type Error;
  fn add_images(&self, tag: &str, batch: &VisualizationBatch, step: usize) -> Result<(), Self::Error>;
}

impl<W: SummaryWriter> SummaryWriter for &W {
  type Error = W::Error;

  fn add_images(&self, tag: &str, batch: &VisualizationBatch, step: usize) -> Result<(), Self::Error> {
    (**self).add_images(tag, batch, step)
  }
}

mod directory_record;
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};
