// 该文件是 Kanjian （看见） 项目的一部分。
// src/labels.rs - 类别名称
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

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("类别文件为空: {0}")]
  Empty(String),
}

/// 每行一个类别名，行号即 class_id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
  names: Vec<String>,
}

impl ClassNames {
  pub fn from_file(path: &Path) -> Result<Self, LabelError> {
    let content = std::fs::read_to_string(path)?;
    let mut names: Vec<String> = content
      .lines()
      .map(|line| line.trim().to_string())
      .collect();
    // 中间的空行仍占一个 class_id，只去掉末尾空行
    while names.last().is_some_and(|name| name.is_empty()) {
      names.pop();
    }
    if names.is_empty() {
      return Err(LabelError::Empty(path.display().to_string()));
    }
    Ok(Self { names })
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn reads_one_name_per_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "background\nperson\n\ncar  \n\n").unwrap();
    let names = ClassNames::from_file(file.path()).unwrap();
    assert_eq!(names.len(), 4);
    assert_eq!(names.name(1), Some("person"));
    assert_eq!(names.name(2), Some(""));
    assert_eq!(names.name(3), Some("car"));
    assert_eq!(names.name(4), None);
  }

  #[test]
  fn blank_only_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "\n  \n").unwrap();
    assert!(matches!(
      ClassNames::from_file(file.path()),
      Err(LabelError::Empty(_))
    ));
  }

  #[test]
  fn empty_file_is_rejected() {
    let file = tempfile::NamedTempFile::new().unwrap();
    assert!(matches!(
      ClassNames::from_file(file.path()),
      Err(LabelError::Empty(_))
    ));
  }
}
