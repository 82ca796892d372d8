// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  fs::OpenOptions,
  io::Write,
  path::{Path, PathBuf},
};

use chrono::{Local, Utc};
use ndarray::Axis;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  compose::VisualizationBatch,
  frame::{ChwImage, PixelRange},
  output::SummaryWriter,
};

const EVENTS_FILE: &str = "events.jsonl";
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("图像形状错误: {0}")]
  ShapeError(#[from] crate::visualize::VisualizeError),
}

/// 把每次运行的可视化结果写入 `<root>/<启动时间>/` 目录
pub struct DirectoryRecordOutput {
  run_dir: PathBuf,
  range: PixelRange,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let range = if uri.query_pairs().any(|(k, v)| k == "range" && v == "byte") {
      PixelRange::Byte
    } else {
      PixelRange::Unit
    };

    Self::new(Path::new(uri.path()), range)
  }
}

impl DirectoryRecordOutput {
  pub fn new(root: &Path, range: PixelRange) -> Result<Self, DirectoryRecordOutputError> {
    let run_dir = root.join(Local::now().format("%Y-%m-%d_%H-%M-%S").to_string());
    std::fs::create_dir_all(&run_dir)?;
    info!("可视化结果保存到: {}", run_dir.display());
    Ok(Self { run_dir, range })
  }

  pub fn run_dir(&self) -> &Path {
    &self.run_dir
  }

  /// 保存本次运行的参数
  pub fn save_experiment_config(
    &self,
    config: &serde_json::Value,
  ) -> Result<(), DirectoryRecordOutputError> {
    let path = self.run_dir.join(CONFIG_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(config)?)?;
    info!("运行参数保存到: {}", path.display());
    Ok(())
  }

  fn tag_dir(&self, tag: &str) -> PathBuf {
    self.run_dir.join(tag.replace('/', "_"))
  }

  fn append_event(
    &self,
    tag: &str,
    batch: &VisualizationBatch,
    step: usize,
  ) -> Result<(), DirectoryRecordOutputError> {
    let (m, c, h, w) = batch.shape();
    let event = json!({
      "tag": tag,
      "step": step,
      "images": batch.image_indices,
      "shape": [m, c, h, w],
      "wall_time": Utc::now().to_rfc3339(),
    });
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(self.run_dir.join(EVENTS_FILE))?;
    writeln!(file, "{}", serde_json::to_string(&event)?)?;
    Ok(())
  }
}

impl SummaryWriter for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn add_images(
    &self,
    tag: &str,
    batch: &VisualizationBatch,
    step: usize,
  ) -> Result<(), Self::Error> {
    if batch.is_empty() {
      debug!("步骤 {} 没有可保存的图像", step);
      return Ok(());
    }

    let directory = self.tag_dir(tag);
    std::fs::create_dir_all(&directory)?;

    for (k, image) in batch.tensor.axis_iter(Axis(0)).enumerate() {
      let image = ChwImage::from_view(image)?.to_rgb_image(self.range);
      let path = directory.join(format!("{:06}-{}.png", step, k));
      image.save(&path)?;
      debug!("保存图像: {}", path.display());
    }

    self.append_event(tag, batch, step)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::Array4;

  fn batch(m: usize) -> VisualizationBatch {
    VisualizationBatch {
      image_indices: (0..m).collect(),
      tensor: Array4::from_elem((m, 3, 6, 5), 0.5),
    }
  }

  #[test]
  fn writes_images_and_events() {
    let root = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(root.path(), PixelRange::Unit).unwrap();

    output.add_images("test/pred_batch", &batch(2), 3).unwrap();
    output.add_images("test/pred_batch", &batch(1), 4).unwrap();

    let dir = output.run_dir().join("test_pred_batch");
    let saved = image::open(dir.join("000003-1.png")).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (5, 6));
    assert_eq!(saved.get_pixel(0, 0).0, [128, 128, 128]);
    assert!(dir.join("000004-0.png").exists());

    let events = std::fs::read_to_string(output.run_dir().join(EVENTS_FILE)).unwrap();
    let lines: Vec<serde_json::Value> = events
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["step"], 3);
    assert_eq!(lines[0]["shape"], json!([2, 3, 6, 5]));
    assert_eq!(lines[1]["images"], json!([0]));
  }

  #[test]
  fn empty_batch_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(root.path(), PixelRange::Unit).unwrap();
    output.add_images("test", &batch(0), 0).unwrap();
    assert!(!output.run_dir().join(EVENTS_FILE).exists());
  }

  #[test]
  fn saves_experiment_config() {
    let root = tempfile::tempdir().unwrap();
    let url = Url::parse(&format!("folder://{}?range=byte", root.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.range, PixelRange::Byte);

    output
      .save_experiment_config(&json!({ "max_images": 2 }))
      .unwrap();
    let saved: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(output.run_dir().join(CONFIG_FILE)).unwrap())
        .unwrap();
    assert_eq!(saved["max_images"], 2);
  }
}
