// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/image_folder.rs - 图像目录输入
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

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage, imageops::FilterType};
use ndarray::{Array4, Axis};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{ChwImage, PixelRange, RGB_CHANNELS},
  input::ImageBatch,
};

const DEFAULT_IMAGE_SIZE: u32 = 416;
const DEFAULT_BATCH_SIZE: usize = 8;
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum ImageFolderInputError {
  #[error("URI scheme mismatch: expected '{expected}', found '{found}'")]
  SchemeMismatch { expected: &'static str, found: String },
  #[error("Invalid query parameter {key}={value}")]
  InvalidQuery { key: String, value: String },
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 将图像变为正方形的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SquareMode {
  /// 居中裁剪到短边
  #[default]
  Crop,
  /// 居中放到长边大小的黑色画布上
  Pad,
}

impl std::str::FromStr for SquareMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "crop" => Ok(SquareMode::Crop),
      "pad" => Ok(SquareMode::Pad),
      other => Err(format!("unknown square mode: {}", other)),
    }
  }
}

#[derive(Debug, Clone)]
pub struct ImageFolderInput {
  paths: Vec<PathBuf>,
  size: u32,
  batch_size: usize,
  square: SquareMode,
}

impl FromUrlWithScheme for ImageFolderInput {
  const SCHEME: &'static str = "folder";
}

fn parse_query<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ImageFolderInputError> {
  value.parse().map_err(|_| ImageFolderInputError::InvalidQuery {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl FromUrl for ImageFolderInput {
  type Error = ImageFolderInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFolderInputError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    let mut size = DEFAULT_IMAGE_SIZE;
    let mut batch_size = DEFAULT_BATCH_SIZE;
    let mut square = SquareMode::default();
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "size" => size = parse_query(&k, &v)?,
        "batch" => batch_size = parse_query(&k, &v)?,
        "square" => square = parse_query(&k, &v)?,
        _ => debug!("ignore query parameter {}={}", k, v),
      }
    }

    if size == 0 || batch_size == 0 {
      return Err(ImageFolderInputError::InvalidQuery {
        key: if size == 0 { "size" } else { "batch" }.to_string(),
        value: "0".to_string(),
      });
    }

    Self::new(Path::new(url.path()), size, batch_size, square)
  }
}

impl ImageFolderInput {
  pub fn new(
    directory: &Path,
    size: u32,
    batch_size: usize,
    square: SquareMode,
  ) -> Result<Self, ImageFolderInputError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
      if path.is_file() && is_image {
        paths.push(path);
      }
    }
    paths.sort();

    info!("image folder {}: {} images", directory.display(), paths.len());

    Ok(Self {
      paths,
      size,
      batch_size: batch_size.max(1),
      square,
    })
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  pub fn num_batches(&self) -> usize {
    self.paths.len().div_ceil(self.batch_size)
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size
  }

  pub fn into_batches(self) -> ImageFolderBatches {
    ImageFolderBatches {
      inner: self,
      cursor: 0,
    }
  }
}

fn make_square(image: RgbImage, mode: SquareMode) -> RgbImage {
  let (w, h) = image.dimensions();
  if w == h {
    return image;
  }
  match mode {
    SquareMode::Crop => {
      let side = w.min(h);
      image::imageops::crop_imm(&image, (w - side) / 2, (h - side) / 2, side, side).to_image()
    }
    SquareMode::Pad => {
      let side = w.max(h);
      let mut canvas = RgbImage::new(side, side);
      image::imageops::overlay(
        &mut canvas,
        &image,
        ((side - w) / 2) as i64,
        ((side - h) / 2) as i64,
      );
      canvas
    }
  }
}

fn load_image(path: &Path, size: u32, square: SquareMode) -> Result<ChwImage, ImageFolderInputError> {
  let image = ImageReader::open(path)?.decode()?.to_rgb8();
  let image = make_square(image, square);
  let image = image::imageops::resize(&image, size, size, FilterType::Triangle);
  Ok(ChwImage::from_rgb_image(&image, PixelRange::Unit))
}

pub struct ImageFolderBatches {
  inner: ImageFolderInput,
  cursor: usize,
}

impl Iterator for ImageFolderBatches {
  type Item = ImageBatch;

  fn next(&mut self) -> Option<Self::Item> {
    let size = self.inner.size as usize;
    while self.cursor < self.inner.paths.len() {
      let end = (self.cursor + self.inner.batch_size).min(self.inner.paths.len());
      let chunk = &self.inner.paths[self.cursor..end];
      self.cursor = end;

      let mut paths = Vec::with_capacity(chunk.len());
      let mut images = Vec::with_capacity(chunk.len());
      for path in chunk {
        match load_image(path, self.inner.size, self.inner.square) {
          Ok(image) => {
            paths.push(path.clone());
            images.push(image);
          }
          Err(e) => error!("failed to load {}: {}", path.display(), e),
        }
      }

      if images.is_empty() {
        continue;
      }

      let mut pixels = Array4::zeros((images.len(), RGB_CHANNELS, size, size));
      for (k, image) in images.into_iter().enumerate() {
        pixels.index_axis_mut(Axis(0), k).assign(image.data());
      }
      return Some(ImageBatch { paths, pixels });
    }
    None
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = self.inner.paths.len() - self.cursor;
    (0, Some(remaining.div_ceil(self.inner.batch_size)))
  }
}
