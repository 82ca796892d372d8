// 该文件是 Kanjian （看见） 项目的一部分。
// tests/pipeline.rs - 端到端可视化流程测试
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

use std::sync::Arc;

use image::{Rgb, RgbImage};
use ndarray::{Array2, Array4, array};

use kanjian::{
  FromUrl,
  color::ClassColor,
  detection::{COORD_HIGH_FIX, COORD_LOW_FIX},
  input::ImageFolderInput,
  model::ReplayModel,
  output::DirectoryRecordOutput,
  task::{EvaluationTask, Task},
  visualize::{VisualizeConfig, Visualizer},
};

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];

fn detections() -> Array2<f32> {
  array![
    [0.0, 1.0, 0.9, 0.1, 0.1, 0.5, 0.5],
    [0.0, 1.0, 0.8, 1.5, 0.2, 0.6, 0.6],
    [1.0, 2.0, 0.7, -0.3, 0.3, 0.7, 0.7],
  ]
}

fn visualizer() -> Visualizer {
  let colors = ClassColor::from_colors(vec![[0, 0, 0], RED, GREEN]);
  Visualizer::new(
    VisualizeConfig::default()
      .with_max_images(2)
      .with_max_box_per_class(Some(1)),
    Arc::new(colors),
  )
}

#[test]
fn four_image_batch_keeps_two_images() {
  let vis = visualizer();
  let mut dets = detections();

  let fixed = kanjian::detection::sanitize_tensor(&mut dets, vis.config().layout).unwrap();
  assert_eq!(fixed, 2);
  assert_eq!(dets[[1, 3]], COORD_HIGH_FIX);
  assert_eq!(dets[[2, 3]], COORD_LOW_FIX);

  let plans = vis.plan_batch(4, dets.view()).unwrap();
  assert_eq!(plans.len(), 2);

  // 每类只取前缀的第一个框
  assert_eq!(plans[0].image_index, 0);
  assert_eq!(plans[0].boxes.len(), 1);
  assert_eq!(plans[0].boxes[0].class_id, 1);
  assert_eq!(plans[0].boxes[0].bbox.0, [0.1, 0.1, 0.5, 0.5]);

  assert_eq!(plans[1].image_index, 1);
  assert_eq!(plans[1].boxes.len(), 1);
  assert_eq!(plans[1].boxes[0].class_id, 2);
  assert_eq!(plans[1].boxes[0].bbox.0, [COORD_LOW_FIX, 0.3, 0.7, 0.7]);

  let images = Array4::<f32>::zeros((4, 3, 10, 10));
  let batch = vis.visualize_batch(images.view(), dets.view()).unwrap();
  assert_eq!(batch.shape(), (2, 3, 10, 10));
  assert_eq!(batch.image_indices, vec![0, 1]);

  let first = batch.image(0);
  assert_eq!(first[[0, 1, 1]], 1.0);
  // 第二个 1 类框未被选中
  assert_eq!(first[[0, 2, 9]], 0.0);

  let second = batch.image(1);
  assert_eq!(second[[1, 3, 0]], 1.0);
  assert_eq!(second[[0, 3, 0]], 0.0);
}

#[test]
fn visualization_is_deterministic() {
  let vis = visualizer();
  let images = Array4::from_shape_fn((4, 3, 16, 16), |(n, c, y, x)| {
    ((n + c * 3 + y * 5 + x * 7) % 11) as f32 / 10.0
  });
  let a = vis.visualize_batch(images.view(), detections().view()).unwrap();
  let b = vis.visualize_batch(images.view(), detections().view()).unwrap();
  assert_eq!(a, b);
}

#[test]
fn folder_replay_and_record_run_together() {
  let data = tempfile::tempdir().unwrap();
  for name in ["a.png", "b.png", "c.png"] {
    RgbImage::from_pixel(20, 12, Rgb([40, 80, 120]))
      .save(data.path().join(name))
      .unwrap();
  }
  let records = data.path().join("records.txt");
  std::fs::write(
    &records,
    "a.png, 1, 0.9, 0.1, 0.1, 0.5, 0.5\nc.png, 2, 0.7, -0.3, 0.3, 1.7, 0.7\n",
  )
  .unwrap();

  let input = ImageFolderInput::from_url(
    &url::Url::parse(&format!("folder://{}?size=16&batch=2", data.path().display())).unwrap(),
  )
  .unwrap();
  assert_eq!(input.len(), 3);
  let model = ReplayModel::from_url(
    &url::Url::parse(&format!("replay://{}", records.display())).unwrap(),
  )
  .unwrap();

  let logs = tempfile::tempdir().unwrap();
  let output =
    DirectoryRecordOutput::new(logs.path(), kanjian::frame::PixelRange::Unit).unwrap();

  let report = EvaluationTask::new(visualizer())
    .run_task(input.into_batches(), model, &output)
    .unwrap();

  assert_eq!(report.batches, 2);
  assert_eq!(report.visualized, 2);
  assert_eq!(report.skipped, 0);
  assert_eq!(report.images_logged, 3);
  assert_eq!(report.detections, 2);

  let tag_dir = output.run_dir().join("test_pred_batch");
  assert!(tag_dir.join("000000-0.png").exists());
  assert!(tag_dir.join("000000-1.png").exists());
  assert!(tag_dir.join("000001-0.png").exists());
}
