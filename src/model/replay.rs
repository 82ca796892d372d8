// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/replay.rs - 回放预先计算的检测结果
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

use std::{collections::HashMap, path::Path};

use ndarray::Array2;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, detection::DetectionLayout, input::ImageBatch, model::Model,
};

// 文件名 + 检测张量中除 image_index 以外的列
const REPLAY_FIELDS: usize = 7;
const REPLAY_FIELDS_NO_SCORE: usize = 6;
// 没有分数的记录按检测布局输出时使用
const DEFAULT_SCORE: f32 = 1.0;

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: &'static str, found: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("第 {line} 行格式错误: {reason}")]
  Parse { line: usize, reason: String },
  #[error("张量错误: {0}")]
  Tensor(#[from] ndarray::ShapeError),
}

#[derive(Debug, Clone, PartialEq)]
struct ReplayRow {
  class_id: f32,
  score: Option<f32>,
  bbox: [f32; 4],
}

/// 从文本文件回放检测结果，每行：
/// `image_name, class_id, score, x1, y1, x2, y2`，
/// 真值记录可省略 `score`。
///
/// `#` 开头的行与空行被忽略。
#[derive(Debug, Clone, Default)]
pub struct ReplayModel {
  // 按文件顺序保存，推理时保持原始顺序输出
  rows: Vec<(String, ReplayRow)>,
  layout: DetectionLayout,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }
    Self::from_file(Path::new(url.path()))
  }
}

impl ReplayModel {
  pub fn from_file(path: &Path) -> Result<Self, ReplayModelError> {
    info!("加载检测记录: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let model = Self::parse(&content)?;
    info!("共 {} 条检测记录", model.rows.len());
    Ok(model)
  }

  pub fn parse(content: &str) -> Result<Self, ReplayModelError> {
    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let fields: Vec<&str> = line.split(',').map(str::trim).collect();
      if fields.len() != REPLAY_FIELDS && fields.len() != REPLAY_FIELDS_NO_SCORE {
        return Err(ReplayModelError::Parse {
          line: i + 1,
          reason: format!(
            "期望 {} 或 {} 个字段, 实际 {}",
            REPLAY_FIELDS,
            REPLAY_FIELDS_NO_SCORE,
            fields.len()
          ),
        });
      }

      let values = fields[1..]
        .iter()
        .map(|field| {
          field.parse::<f32>().map_err(|_| ReplayModelError::Parse {
            line: i + 1,
            reason: format!("无法解析数值 '{}'", field),
          })
        })
        .collect::<Result<Vec<_>, _>>()?;

      // 坐标总是最后四列
      let score = (values.len() == REPLAY_FIELDS - 1).then(|| values[1]);
      let c = values.len() - 4;
      let bbox = [values[c], values[c + 1], values[c + 2], values[c + 3]];

      rows.push((
        fields[0].to_string(),
        ReplayRow {
          class_id: values[0],
          score,
          bbox,
        },
      ));
    }
    Ok(Self {
      rows,
      layout: DetectionLayout::default(),
    })
  }

  /// 输出张量的列布局
  pub fn with_layout(mut self, layout: DetectionLayout) -> Self {
    self.layout = layout;
    self
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

impl Model for ReplayModel {
  type Input = ImageBatch;
  type Output = Array2<f32>;
  type Error = ReplayModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let index: HashMap<String, usize> = input
      .file_names()
      .into_iter()
      .enumerate()
      .map(|(i, name)| (name, i))
      .collect();

    let width = self.layout.width();
    let mut data = Vec::new();
    for (name, row) in self.rows.iter() {
      let Some(&image_index) = index.get(name) else {
        continue;
      };
      data.extend_from_slice(&[image_index as f32, row.class_id]);
      if self.layout == DetectionLayout::Detection {
        data.push(row.score.unwrap_or(DEFAULT_SCORE));
      }
      data.extend_from_slice(&row.bbox);
    }

    let n = data.len() / width;
    debug!("批次 {} 张图像, 回放 {} 个检测", input.len(), n);
    Ok(Array2::from_shape_vec((n, width), data)?)
  }
}
