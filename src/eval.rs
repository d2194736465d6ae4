// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/eval.rs - 门控模型离线评估
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::frame::RgbTensorFrame;
use crate::input::ImageInput;
use crate::model::{GateDecision, GateModel, Model, ModelError};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum EvalError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("数据集目录应包含两个子目录, 实际 {0} 个")]
  NotBinary(usize),
  #[error("未知的正类名: {0}")]
  UnknownPositive(String),
  #[error("数据集中没有可用样本")]
  Empty,
  #[error("门控模型错误: {0}")]
  Model(#[from] ModelError),
}

/// 二分类标注数据集：根目录下恰好两个子目录，目录名即类别名。
/// 子目录按字典序排列，默认第二个为正类（可覆盖）。
pub struct LabeledImageDir {
  class_names: [String; 2],
  samples: Vec<(PathBuf, bool)>,
}

impl LabeledImageDir {
  pub fn open(root: impl Into<PathBuf>, positive: Option<&str>) -> Result<Self, EvalError> {
    let root = root.into();

    let mut class_dirs: Vec<PathBuf> = std::fs::read_dir(&root)?
      .filter_map(|entry| entry.ok())
      .map(|entry| entry.path())
      .filter(|path| path.is_dir())
      .collect();
    class_dirs.sort();

    if class_dirs.len() != 2 {
      return Err(EvalError::NotBinary(class_dirs.len()));
    }

    let mut class_names: [String; 2] = [dir_name(&class_dirs[0]), dir_name(&class_dirs[1])];
    if let Some(positive) = positive {
      if positive == class_names[0] {
        class_names.swap(0, 1);
        class_dirs.swap(0, 1);
      } else if positive != class_names[1] {
        return Err(EvalError::UnknownPositive(positive.to_string()));
      }
    }

    let mut samples = Vec::new();
    for (index, dir) in class_dirs.iter().enumerate() {
      let is_positive = index == 1;
      for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
          samples.push((path, is_positive));
        }
      }
    }
    samples.sort();

    info!(
      "数据集就绪: {} 个样本 (负类 {}, 正类 {})",
      samples.len(),
      class_names[0],
      class_names[1]
    );

    Ok(LabeledImageDir {
      class_names,
      samples,
    })
  }

  pub fn class_names(&self) -> &[String; 2] {
    &self.class_names
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn samples(&self) -> &[(PathBuf, bool)] {
    &self.samples
  }
}

fn dir_name(path: &std::path::Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default()
}

fn has_image_extension(path: &std::path::Path) -> bool {
  path
    .extension()
    .map(|ext| {
      let lower = ext.to_string_lossy().to_lowercase();
      IMAGE_EXTENSIONS.contains(&lower.as_str())
    })
    .unwrap_or(false)
}

/// 门控模型的离线评估报告。
#[derive(Debug, Clone, Serialize)]
pub struct GateEvalReport {
  pub generated_at: String,
  pub threshold: f32,
  /// [负类, 正类]
  pub classes: [String; 2],
  pub total: usize,
  pub skipped: usize,
  pub true_positive: usize,
  pub false_positive: usize,
  pub true_negative: usize,
  pub false_negative: usize,
  pub accuracy: f64,
  pub precision: f64,
  pub recall: f64,
  pub f1: f64,
  /// 秩法计算；数据集只含单一类别时为 None
  pub roc_auc: Option<f64>,
}

/// 对标注数据集逐张运行门控模型，按给定阈值汇总二分类指标。
/// 无法解码的图像计入 skipped 并跳过。
pub fn evaluate_gate<G>(
  gate: &G,
  dataset: &LabeledImageDir,
  threshold: f32,
) -> Result<GateEvalReport, EvalError>
where
  G: Model<Input = RgbTensorFrame, Output = GateDecision, Error = ModelError>,
{
  let mut scored: Vec<(f32, bool)> = Vec::with_capacity(dataset.len());
  let mut skipped = 0usize;

  for (path, is_positive) in dataset.samples() {
    match ImageInput::File(path.clone()).decode() {
      Ok(image) => {
        let frame = RgbTensorFrame::from(&image);
        let decision = gate.infer(&frame)?;
        scored.push((decision.probability, *is_positive));
      }
      Err(err) => {
        warn!("跳过无法解码的图像 {}: {err}", path.display());
        skipped += 1;
      }
    }
  }

  if scored.is_empty() {
    return Err(EvalError::Empty);
  }

  Ok(report_from_scores(
    &scored,
    threshold,
    dataset.class_names().clone(),
    skipped,
  ))
}

fn report_from_scores(
  scored: &[(f32, bool)],
  threshold: f32,
  classes: [String; 2],
  skipped: usize,
) -> GateEvalReport {
  let mut true_positive = 0usize;
  let mut false_positive = 0usize;
  let mut true_negative = 0usize;
  let mut false_negative = 0usize;

  for &(probability, is_positive) in scored {
    // 与门控判定保持同一比较语义：严格大于
    let predicted = GateModel::decide(threshold, probability);
    match (is_positive, predicted) {
      (true, true) => true_positive += 1,
      (true, false) => false_negative += 1,
      (false, true) => false_positive += 1,
      (false, false) => true_negative += 1,
    }
  }

  let total = scored.len();
  let accuracy = (true_positive + true_negative) as f64 / total as f64;
  let precision = ratio(true_positive, true_positive + false_positive);
  let recall = ratio(true_positive, true_positive + false_negative);
  let f1 = if precision + recall > 0.0 {
    2.0 * precision * recall / (precision + recall)
  } else {
    0.0
  };

  GateEvalReport {
    generated_at: Utc::now().to_rfc3339(),
    threshold,
    classes,
    total,
    skipped,
    true_positive,
    false_positive,
    true_negative,
    false_negative,
    accuracy,
    precision,
    recall,
    f1,
    roc_auc: roc_auc(scored),
  }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
  if denominator == 0 {
    0.0
  } else {
    numerator as f64 / denominator as f64
  }
}

/// 秩法（Mann-Whitney U）计算 ROC-AUC，并列得分取平均秩。
fn roc_auc(scored: &[(f32, bool)]) -> Option<f64> {
  let positives = scored.iter().filter(|(_, p)| *p).count();
  let negatives = scored.len() - positives;
  if positives == 0 || negatives == 0 {
    return None;
  }

  let mut order: Vec<usize> = (0..scored.len()).collect();
  order.sort_by(|&a, &b| scored[a].0.total_cmp(&scored[b].0));

  // 并列区间共享平均秩
  let mut ranks = vec![0.0f64; scored.len()];
  let mut start = 0;
  while start < order.len() {
    let mut end = start;
    while end + 1 < order.len() && scored[order[end + 1]].0 == scored[order[start]].0 {
      end += 1;
    }
    let average_rank = (start + end) as f64 / 2.0 + 1.0;
    for &index in &order[start..=end] {
      ranks[index] = average_rank;
    }
    start = end + 1;
  }

  let positive_rank_sum: f64 = scored
    .iter()
    .zip(&ranks)
    .filter(|((_, is_positive), _)| *is_positive)
    .map(|(_, &rank)| rank)
    .sum();

  let u = positive_rank_sum - (positives * (positives + 1)) as f64 / 2.0;
  Some(u / (positives * negatives) as f64)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn classes() -> [String; 2] {
    ["not_leaf".to_string(), "leaf".to_string()]
  }

  #[test]
  fn perfectly_separated_scores() {
    let scored = [(0.9, true), (0.8, true), (0.3, false), (0.1, false)];
    let report = report_from_scores(&scored, 0.5, classes(), 0);

    assert_eq!(report.true_positive, 2);
    assert_eq!(report.true_negative, 2);
    assert_eq!(report.false_positive, 0);
    assert_eq!(report.false_negative, 0);
    assert_eq!(report.accuracy, 1.0);
    assert_eq!(report.precision, 1.0);
    assert_eq!(report.recall, 1.0);
    assert_eq!(report.f1, 1.0);
    assert_eq!(report.roc_auc, Some(1.0));
  }

  #[test]
  fn indistinguishable_scores_have_half_auc() {
    let scored = [(0.5, true), (0.5, false)];
    let report = report_from_scores(&scored, 0.5, classes(), 0);

    // 严格大于：0.5 不超过阈值 0.5，两张都判为负类
    assert_eq!(report.true_negative, 1);
    assert_eq!(report.false_negative, 1);
    assert_eq!(report.roc_auc, Some(0.5));
  }

  #[test]
  fn mixed_scores_metrics() {
    let scored = [(0.9, true), (0.6, false), (0.4, true), (0.2, false)];
    let report = report_from_scores(&scored, 0.5, classes(), 0);

    assert_eq!(report.true_positive, 1);
    assert_eq!(report.false_positive, 1);
    assert_eq!(report.true_negative, 1);
    assert_eq!(report.false_negative, 1);
    assert_eq!(report.accuracy, 0.5);
    assert_eq!(report.precision, 0.5);
    assert_eq!(report.recall, 0.5);
    assert_eq!(report.f1, 0.5);
    // 正类对 (0.9, 0.4) 对负类对 (0.6, 0.2)：四对中赢三对
    assert_eq!(report.roc_auc, Some(0.75));
  }

  #[test]
  fn single_class_has_no_auc() {
    let scored = [(0.9, true), (0.8, true)];
    let report = report_from_scores(&scored, 0.5, classes(), 0);
    assert_eq!(report.roc_auc, None);
    assert_eq!(report.recall, 1.0);
  }

  #[test]
  fn labeled_dir_enumeration_and_positive_override() {
    let root = std::env::temp_dir().join(format!("zaoye-eval-{}", std::process::id()));
    let leaf = root.join("leaf");
    let not_leaf = root.join("not_leaf");
    std::fs::create_dir_all(&leaf).unwrap();
    std::fs::create_dir_all(&not_leaf).unwrap();
    std::fs::write(leaf.join("a.png"), b"x").unwrap();
    std::fs::write(leaf.join("b.JPG"), b"x").unwrap();
    std::fs::write(leaf.join("notes.txt"), b"x").unwrap();
    std::fs::write(not_leaf.join("c.webp"), b"x").unwrap();

    // 默认字典序第二个子目录为正类
    let dataset = LabeledImageDir::open(&root, None).unwrap();
    assert_eq!(dataset.class_names(), &["leaf".to_string(), "not_leaf".to_string()]);
    assert_eq!(dataset.len(), 3);
    assert_eq!(
      dataset.samples().iter().filter(|(_, p)| *p).count(),
      1,
      "正类应只包含 not_leaf 下的样本"
    );

    // 覆盖正类
    let dataset = LabeledImageDir::open(&root, Some("leaf")).unwrap();
    assert_eq!(dataset.class_names(), &["not_leaf".to_string(), "leaf".to_string()]);
    assert_eq!(dataset.samples().iter().filter(|(_, p)| *p).count(), 2);

    let unknown = LabeledImageDir::open(&root, Some("weeds"));
    assert!(matches!(unknown, Err(EvalError::UnknownPositive(_))));

    std::fs::remove_dir_all(&root).ok();
  }
}
