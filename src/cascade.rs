// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/cascade.rs - 两级级联编排
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::frame::RgbTensorFrame;
use crate::input::{DecodeError, ImageInput};
use crate::model::{GateDecision, LabelSet, Model, ModelError};

/// 单条预测记录。集合内 class_index 互不重复，按置信度降序排列。
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
  pub disease: String,
  pub confidence: f32,
  pub class_index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CascadeOutcome {
  /// 门控未通过：图像不是目标域，第二级从未运行。
  Rejected { probability: f32 },
  /// 门控通过后的完整排序预测列表。
  Classified { predictions: Vec<Prediction> },
}

#[derive(Error, Debug)]
pub enum CascadeError {
  #[error("图像解码错误: {0}")]
  Decode(#[from] DecodeError),
  #[error("门控模型错误: {0}")]
  Gate(ModelError),
  #[error("病害模型错误: {0}")]
  Disease(ModelError),
}

/// 级联预测摘要：最可能的类别与置信度不低于给定门限的显著预测。
#[derive(Debug, Clone, Serialize)]
pub struct PredictionSummary {
  pub top_prediction: Prediction,
  pub significant_predictions: Vec<Prediction>,
  pub prediction_count: usize,
}

/// 从已排序的预测列表提取摘要；空列表返回 None。
pub fn summarize(predictions: &[Prediction], min_confidence: f32) -> Option<PredictionSummary> {
  let top_prediction = predictions.first()?.clone();
  let significant_predictions: Vec<Prediction> = predictions
    .iter()
    .filter(|prediction| prediction.confidence >= min_confidence)
    .cloned()
    .collect();

  Some(PredictionSummary {
    top_prediction,
    prediction_count: significant_predictions.len(),
    significant_predictions,
  })
}

/// 两级级联预测器。门控先决定图像是否属于目标域，
/// 通过后才运行病害分类；两级共用同一个归一化帧。
pub struct CascadePredictor<G, D> {
  gate: G,
  disease: D,
  labels: LabelSet,
}

impl<G, D> CascadePredictor<G, D>
where
  G: Model<Input = RgbTensorFrame, Output = GateDecision, Error = ModelError>,
  D: Model<Input = RgbTensorFrame, Output = Box<[f32]>, Error = ModelError>,
{
  pub fn new(gate: G, disease: D, labels: LabelSet) -> Self {
    CascadePredictor {
      gate,
      disease,
      labels,
    }
  }

  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  pub fn predict(&self, input: ImageInput) -> Result<CascadeOutcome, CascadeError> {
    let image = input.decode()?;
    let frame = RgbTensorFrame::from(&image);
    self.predict_frame(&frame)
  }

  pub fn predict_frame(&self, frame: &RgbTensorFrame) -> Result<CascadeOutcome, CascadeError> {
    let gate = self.gate.infer(frame).map_err(CascadeError::Gate)?;

    if !gate.is_palm {
      info!("图像未被识别为棕榈叶, 门控概率 {:.4}", gate.probability);
      return Ok(CascadeOutcome::Rejected {
        probability: gate.probability,
      });
    }
    debug!("门控通过, 概率 {:.4}", gate.probability);

    let distribution = self.disease.infer(frame).map_err(CascadeError::Disease)?;
    if distribution.len() != self.labels.len() {
      return Err(CascadeError::Disease(ModelError::LabelMismatch {
        labels: self.labels.len(),
        classes: distribution.len(),
      }));
    }

    let mut predictions: Vec<Prediction> = distribution
      .iter()
      .enumerate()
      .map(|(class_index, &confidence)| Prediction {
        disease: self
          .labels
          .name(class_index)
          .map(str::to_string)
          .unwrap_or_else(|| format!("class_{class_index}")),
        confidence,
        class_index,
      })
      .collect();

    // 置信度降序；同分时按类别索引升序，保证输出确定
    predictions.sort_by(|a, b| {
      b.confidence
        .total_cmp(&a.confidence)
        .then(a.class_index.cmp(&b.class_index))
    });

    Ok(CascadeOutcome::Classified { predictions })
  }

  /// 兼容入口：任何错误都被记录并折叠成空列表，调用方永远拿到一个序列，
  /// 不会看到异常。区分“被拒绝”与“内部出错”请改用 [`predict`](Self::predict)。
  pub fn get_all_predictions(&self, input: ImageInput) -> Vec<Prediction> {
    match self.predict(input) {
      Ok(CascadeOutcome::Classified { predictions }) => predictions,
      Ok(CascadeOutcome::Rejected { .. }) => Vec::new(),
      Err(err) => {
        error!("预测失败: {err}");
        Vec::new()
      }
    }
  }
}
