// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/model/mod.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {0}")]
  LoadError(ort::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理错误: {0}")]
  InferenceError(ort::Error),
  #[error("输出形状错误: 期望 {expected}, 实际 {actual:?}")]
  OutputShapeError { expected: String, actual: Vec<usize> },
  #[error("标签绑定不匹配: 标签 {labels} 个, 模型类别 {classes} 个")]
  LabelMismatch { labels: usize, classes: usize },
  #[error("推理超时: 超过 {0:?}")]
  InferenceTimeout(std::time::Duration),
}

/// 四分类部署的标签表
pub const PALM_STAGE_LABELS: [&str; 4] = ["disease", "healthy", "deficiency", "pest"];

/// 枣椰八分类部署的标签表
pub const DATE_PALM_LABELS: [&str; 8] = [
  "black_scorch",
  "fusarium_wilt",
  "healthy",
  "magnesium_deficiency",
  "manganese_deficiency",
  "parlatoria_blanchardi",
  "potassium_deficiency",
  "rachis_blight",
];

#[derive(Error, Debug)]
pub enum LabelSetError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("标签集为空")]
  Empty,
}

/// 类别索引到名称的按位绑定。必须与所加载模型的输出向量一一对应，
/// 否则输出会被悄悄贴错标签。
#[derive(Debug, Clone)]
pub struct LabelSet {
  names: Box<[String]>,
}

impl LabelSet {
  pub fn from_slice(names: &[&str]) -> Self {
    Self {
      names: names.iter().map(|s| s.to_string()).collect(),
    }
  }

  pub fn palm_stage() -> Self {
    Self::from_slice(&PALM_STAGE_LABELS)
  }

  pub fn date_palm() -> Self {
    Self::from_slice(&DATE_PALM_LABELS)
  }

  /// 从 JSON 字符串数组文件读取标签表。
  pub fn from_json_file(path: &Path) -> Result<Self, LabelSetError> {
    let raw = std::fs::read_to_string(path)?;
    let names: Vec<String> = serde_json::from_str(&raw)?;
    if names.is_empty() {
      return Err(LabelSetError::Empty);
    }
    Ok(Self {
      names: names.into_boxed_slice(),
    })
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, class_index: usize) -> Option<&str> {
    self.names.get(class_index).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

mod session;
pub use self::session::{ModelOutput, OnnxSession};

mod gate;
pub use self::gate::{DEFAULT_GATE_THRESHOLD, GateDecision, GateModel, GateModelBuilder};

mod disease;
pub use self::disease::{DiseaseModel, DiseaseModelBuilder};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_label_tables() {
    let four = LabelSet::palm_stage();
    assert_eq!(four.len(), 4);
    assert_eq!(four.name(1), Some("healthy"));
    assert_eq!(four.name(3), Some("pest"));
    assert_eq!(four.name(4), None);

    let eight = LabelSet::date_palm();
    assert_eq!(eight.len(), 8);
    assert_eq!(eight.name(0), Some("black_scorch"));
    assert_eq!(eight.name(7), Some("rachis_blight"));
  }

  #[test]
  fn label_set_from_json_file() {
    let path = std::env::temp_dir().join(format!("zaoye-labels-{}.json", std::process::id()));
    std::fs::write(&path, r#"["alpha", "beta", "gamma"]"#).unwrap();
    let labels = LabelSet::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(labels.len(), 3);
    assert_eq!(labels.name(2), Some("gamma"));
    assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["alpha", "beta", "gamma"]);
  }

  #[test]
  fn empty_label_file_is_rejected() {
    let path = std::env::temp_dir().join(format!("zaoye-labels-empty-{}.json", std::process::id()));
    std::fs::write(&path, "[]").unwrap();
    let result = LabelSet::from_json_file(&path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(LabelSetError::Empty)));
  }
}
