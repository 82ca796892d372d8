// 该文件是 Kanjian （看见） 项目的一部分。
// src/bin/evaluate.rs - 评估并可视化检测结果
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

use std::{path::PathBuf, sync::Arc};

use anyhow::{Result, bail};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use kanjian::{
  FromUrl,
  color::ClassColor,
  detection::DetectionLayout,
  input::ImageFolderInput,
  labels::ClassNames,
  model::ReplayModel,
  output::DirectoryRecordOutput,
  task::{DEFAULT_TAG, EvaluationTask, Task},
  visualize::{VisualizeConfig, Visualizer},
};

/// Kanjian 评估参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测结果来源，例如 replay:///path/to/detections.txt
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 图像目录，例如 folder:///data/test?size=416&batch=8&square=crop
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出目录，例如 folder:///logs/run
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 类别名称文件，每行一个
  #[arg(long, value_name = "FILE", conflicts_with = "num_classes")]
  pub names: Option<PathBuf>,
  /// 类别数量（含背景）
  #[arg(long, value_name = "COUNT")]
  pub num_classes: Option<usize>,

  /// 颜色随机种子，不指定时使用色相环配色
  #[arg(long)]
  pub seed: Option<u64>,

  #[arg(long, default_value = "2")]
  pub max_images: usize,
  /// 0 表示不限制
  #[arg(long, default_value = "3")]
  pub max_box_per_class: usize,
  /// detection（7 列）或 ground-truth（6 列）
  #[arg(long, default_value = "detection")]
  pub layout: DetectionLayout,
  #[arg(long, default_value = "2")]
  pub thickness: u32,

  #[arg(long, default_value = DEFAULT_TAG)]
  pub tag: String,
  #[arg(long, value_name = "COUNT")]
  pub max_batches: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("检测结果来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let num_classes = match (&args.names, args.num_classes) {
    (Some(path), _) => {
      let names = ClassNames::from_file(path)?;
      info!("加载 {} 个类别名称", names.len());
      names.len()
    }
    (None, Some(n)) => n,
    (None, None) => bail!("需要指定 --names 或 --num-classes"),
  };

  let colors = match args.seed {
    Some(seed) => ClassColor::seeded(num_classes, seed),
    None => ClassColor::palette(num_classes),
  };

  let config = VisualizeConfig::default()
    .with_max_images(args.max_images)
    .with_max_box_per_class(Some(args.max_box_per_class))
    .with_layout(args.layout)
    .with_thickness(args.thickness);

  let input = ImageFolderInput::from_url(&args.input)?;
  let model = ReplayModel::from_url(&args.model)?.with_layout(args.layout);
  let output = DirectoryRecordOutput::from_url(&args.output)?;

  output.save_experiment_config(&json!({
    "model": args.model.as_str(),
    "input": args.input.as_str(),
    "num_classes": num_classes,
    "seed": args.seed,
    "max_images": args.max_images,
    "max_box_per_class": args.max_box_per_class,
    "layout": format!("{:?}", args.layout),
    "batch_size": input.batch_size(),
    "tag": args.tag,
  }))?;

  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    warn!("收到中断信号，当前批次完成后退出...");
    let _ = tx.send(());
  })?;

  let report = EvaluationTask::new(Visualizer::new(config, Arc::new(colors)))
    .with_tag(args.tag)
    .with_max_batches(args.max_batches)
    .with_stop_signal(rx)
    .run_task(input.into_batches(), model, &output)?;

  info!("结果目录: {}", output.run_dir().display());
  info!("{:?}", report);

  Ok(())
}
