// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 评估任务
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

use std::{sync::mpsc::Receiver, time::Instant};

use ndarray::Array2;
use tracing::{info, warn};

use crate::{
  detection::sanitize_tensor,
  input::ImageBatch,
  model::Model,
  output::SummaryWriter,
  visualize::{VisualizeError, Visualizer},
};

pub const DEFAULT_TAG: &str = "test/pred_batch";

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
  pub batches: usize,
  pub visualized: usize,
  pub skipped: usize,
  pub images_logged: usize,
  pub detections: usize,
}

/// 逐批次推理并记录可视化结果。
///
/// 单个批次的可视化错误只跳过该批次；模型与输出错误终止任务。
pub struct EvaluationTask {
  visualizer: Visualizer,
  tag: String,
  max_batches: Option<usize>,
  stop: Option<Receiver<()>>,
}

impl EvaluationTask {
  pub fn new(visualizer: Visualizer) -> Self {
    Self {
      visualizer,
      tag: DEFAULT_TAG.to_string(),
      max_batches: None,
      stop: None,
    }
  }

  pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
    self.tag = tag.into();
    self
  }

  pub fn with_max_batches(mut self, max_batches: Option<usize>) -> Self {
    self.max_batches = max_batches;
    self
  }

  pub fn with_stop_signal(mut self, stop: Receiver<()>) -> Self {
    self.stop = Some(stop);
    self
  }

  fn visualize(
    &self,
    batch: &ImageBatch,
    detections: &mut Array2<f32>,
  ) -> Result<crate::compose::VisualizationBatch, VisualizeError> {
    let fixed = sanitize_tensor(detections, self.visualizer.config().layout)?;
    if fixed > 0 {
      info!(">> 修正越界坐标: {}", fixed);
    }
    self
      .visualizer
      .visualize_batch(batch.pixels.view(), detections.view())
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  OE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = ImageBatch>,
  M: Model<Input = ImageBatch, Output = Array2<f32>, Error = ME>,
  O: SummaryWriter<Error = OE>,
> Task<I, M, O> for EvaluationTask
{
  type Output = EvaluationReport;
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let num_batches = input
      .size_hint()
      .1
      .map(|n| n.to_string())
      .unwrap_or_else(|| "?".to_string());
    let mut report = EvaluationReport::default();

    for (batch_i, batch) in input.enumerate() {
      if self.max_batches.map(|n| batch_i >= n).unwrap_or(false) {
        info!("达到指定批次数 {}, 退出任务循环", batch_i);
        break;
      }

      let now = Instant::now();
      let mut detections = model.infer(&batch)?;
      let elapsed = now.elapsed();
      report.batches += 1;
      report.detections += detections.nrows();

      info!("- Batch [{}/{}]| 推理耗时: {:.2?}", batch_i, num_batches, elapsed);
      info!(
        ">> 每张图像检测框数: {:.2}",
        detections.nrows() as f32 / batch.len().max(1) as f32
      );

      match self.visualize(&batch, &mut detections) {
        Ok(vis) => {
          output.add_images(&self.tag, &vis, batch_i)?;
          report.visualized += 1;
          report.images_logged += vis.len();
        }
        Err(e) => {
          warn!("批次 {} 可视化失败, 跳过: {}", batch_i, e);
          report.skipped += 1;
        }
      }

      if let Some(stop) = self.stop.as_ref()
        && stop.try_recv().is_ok()
      {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成: {} 个批次, {} 个已可视化, {} 个跳过",
      report.batches, report.visualized, report.skipped
    );
    Ok(report)
  }
}
