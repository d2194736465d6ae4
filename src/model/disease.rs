// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/model/disease.rs - 病害分类模型
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

/// 多分类病害模型：输出固定长度的概率分布。排序与贴标签由级联编排器负责。
pub struct DiseaseModel {
  session: OnnxSession,
  classes: usize,
  timeout: Option<Duration>,
}

pub struct DiseaseModelBuilder {
  model_path: PathBuf,
  classes: usize,
  timeout: Option<Duration>,
}

impl DiseaseModelBuilder {
  /// classes 为调用方绑定的标签集大小，必须与模型输出维度一致。
  pub fn new(model_path: impl Into<PathBuf>, classes: usize) -> Self {
    DiseaseModelBuilder {
      model_path: model_path.into(),
      classes,
      timeout: None,
    }
  }

  pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<DiseaseModel, ModelError> {
    let session = OnnxSession::load(&self.model_path)?;

    // 静态输出维度与绑定的标签数不一致属于配置错误，在加载期拦下
    if let Some(declared) = session.output_classes()
      && declared != self.classes
    {
      return Err(ModelError::LabelMismatch {
        labels: self.classes,
        classes: declared,
      });
    }

    info!("病害模型 {} 就绪, {} 类", session.model_name(), self.classes);
    Ok(DiseaseModel {
      session,
      classes: self.classes,
      timeout: self.timeout,
    })
  }
}

impl DiseaseModel {
  pub fn classes(&self) -> usize {
    self.classes
  }
}

impl Model for DiseaseModel {
  type Input = RgbTensorFrame;
  type Output = Box<[f32]>;
  type Error = ModelError;

  fn infer(&self, input: &RgbTensorFrame) -> Result<Box<[f32]>, ModelError> {
    let output = match self.timeout {
      Some(timeout) => self
        .session
        .run_with_timeout(input.as_array().clone(), timeout)?,
      None => self.session.run(input.as_array())?,
    };

    if output.data.len() != self.classes {
      return Err(ModelError::OutputShapeError {
        expected: format!("{} 类概率分布", self.classes),
        actual: output.shape,
      });
    }

    debug!("病害分布: {:?}", output.data);
    Ok(output.data.into_boxed_slice())
  }
}
