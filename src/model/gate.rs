// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/model/gate.rs - 门控（棕榈叶判定）模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::frame::RgbTensorFrame;
use crate::model::{Model, ModelError, OnnxSession};

/// 参考部署使用 0.3 而不是 0.5，偏向把图像判为棕榈叶。
pub const DEFAULT_GATE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy)]
pub struct GateDecision {
  pub probability: f32,
  pub is_palm: bool,
}

/// 二分类门控模型：输出单个标量概率，经阈值比较得到是否继续级联的判定。
pub struct GateModel {
  session: OnnxSession,
  threshold: f32,
  timeout: Option<Duration>,
}

pub struct GateModelBuilder {
  model_path: PathBuf,
  threshold: f32,
  timeout: Option<Duration>,
}

impl GateModelBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    GateModelBuilder {
      model_path: model_path.into(),
      threshold: DEFAULT_GATE_THRESHOLD,
      timeout: None,
    }
  }

  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<GateModel, ModelError> {
    let session = OnnxSession::load(&self.model_path)?;

    // 元数据声明了静态输出维度时，门控输出必须是单个标量
    if let Some(classes) = session.output_classes()
      && classes != 1
    {
      return Err(ModelError::ModelInvalid(format!(
        "门控模型输出应为单个标量, 实际类别维度为 {classes}"
      )));
    }

    info!("门控模型 {} 就绪, 阈值 {}", session.model_name(), self.threshold);
    Ok(GateModel {
      session,
      threshold: self.threshold,
      timeout: self.timeout,
    })
  }
}

impl GateModel {
  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// 严格大于比较：概率恰好等于阈值时判为否。
  pub fn decide(threshold: f32, probability: f32) -> bool {
    probability > threshold
  }
}

impl Model for GateModel {
  type Input = RgbTensorFrame;
  type Output = GateDecision;
  type Error = ModelError;

  fn infer(&self, input: &RgbTensorFrame) -> Result<GateDecision, ModelError> {
    let output = match self.timeout {
      Some(timeout) => self
        .session
        .run_with_timeout(input.as_array().clone(), timeout)?,
      None => self.session.run(input.as_array())?,
    };

    if output.data.len() != 1 {
      return Err(ModelError::OutputShapeError {
        expected: "单个标量".to_string(),
        actual: output.shape,
      });
    }

    let probability = output.data[0];
    debug!("门控概率: {probability}");

    Ok(GateDecision {
      probability,
      is_palm: Self::decide(self.threshold, probability),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decision_is_strictly_greater_than() {
    assert!(!GateModel::decide(0.3, 0.3));
    assert!(GateModel::decide(0.3, 0.300_01));
    assert!(!GateModel::decide(0.3, 0.25));
    assert!(GateModel::decide(0.3, 0.5));
  }

  #[test]
  fn default_threshold_favors_recall() {
    assert_eq!(DEFAULT_GATE_THRESHOLD, 0.3);
    // 位于传统判定中点之下的概率在默认阈值下仍会放行
    assert!(GateModel::decide(DEFAULT_GATE_THRESHOLD, 0.4));
  }
}
