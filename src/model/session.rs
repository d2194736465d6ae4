// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/model/session.rs - ONNX 推理会话
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use ndarray::Array4;
use ort::session::Session;
use ort::value::{TensorRef, ValueType};
use tracing::{debug, info, warn};

use crate::model::ModelError;

/// 模型单次推理的原始输出。
#[derive(Debug, Clone)]
pub struct ModelOutput {
  pub shape: Vec<usize>,
  pub data: Vec<f32>,
}

/// 对 onnxruntime 会话的薄封装。会话在加载后只读共享，
/// Mutex 仅因为运行时的 run 调用要求独占访问。
pub struct OnnxSession {
  session: Arc<Mutex<Session>>,
  input_name: String,
  output_name: String,
  model_name: String,
}

impl OnnxSession {
  pub fn load(model_path: &Path) -> Result<Self, ModelError> {
    info!("加载模型文件: {}", model_path.display());
    let session = Session::builder()
      .and_then(|builder| builder.commit_from_file(model_path))
      .map_err(ModelError::LoadError)?;

    let input_name = session
      .inputs
      .first()
      .map(|input| input.name.clone())
      .ok_or_else(|| ModelError::ModelInvalid("模型没有声明输入".to_string()))?;
    let output_name = session
      .outputs
      .first()
      .map(|output| output.name.clone())
      .ok_or_else(|| ModelError::ModelInvalid("模型没有声明输出".to_string()))?;

    let model_name = model_path
      .file_stem()
      .map(|stem| stem.to_string_lossy().into_owned())
      .unwrap_or_else(|| "model".to_string());

    debug!("模型 {}: 输入 '{}', 输出 '{}'", model_name, input_name, output_name);
    info!("模型 {} 加载完成", model_name);

    Ok(OnnxSession {
      session: Arc::new(Mutex::new(session)),
      input_name,
      output_name,
      model_name,
    })
  }

  pub fn model_name(&self) -> &str {
    &self.model_name
  }

  /// 模型元数据声明的类别数（输出张量最后一维）。
  /// 动态维度时返回 None，此时绑定检查推迟到首次推理。
  pub fn output_classes(&self) -> Option<usize> {
    let session = self.session.lock().ok()?;
    let output = session.outputs.first()?;
    match &output.output_type {
      ValueType::Tensor { shape, .. } => {
        let last = *shape.last()?;
        usize::try_from(last).ok()
      }
      _ => None,
    }
  }

  pub fn run(&self, input: &Array4<f32>) -> Result<ModelOutput, ModelError> {
    let mut session = self
      .session
      .lock()
      .map_err(|_| ModelError::ModelInvalid("推理会话锁中毒".to_string()))?;
    run_locked(&mut session, &self.input_name, &self.output_name, input)
  }

  /// 在工作线程中执行推理并限时等待。超时后返回错误，
  /// 残留的推理调用在后台完成（期间会话保持占用）。
  pub fn run_with_timeout(
    &self,
    input: Array4<f32>,
    timeout: Duration,
  ) -> Result<ModelOutput, ModelError> {
    let session = Arc::clone(&self.session);
    let input_name = self.input_name.clone();
    let output_name = self.output_name.clone();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
      let result = match session.lock() {
        Ok(mut session) => run_locked(&mut session, &input_name, &output_name, &input),
        Err(_) => Err(ModelError::ModelInvalid("推理会话锁中毒".to_string())),
      };
      let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
      Ok(result) => result,
      Err(mpsc::RecvTimeoutError::Timeout) => {
        warn!("模型 {} 推理超过 {:?}, 放弃等待", self.model_name, timeout);
        Err(ModelError::InferenceTimeout(timeout))
      }
      Err(mpsc::RecvTimeoutError::Disconnected) => {
        Err(ModelError::ModelInvalid("推理线程意外中止".to_string()))
      }
    }
  }
}

fn run_locked(
  session: &mut Session,
  input_name: &str,
  output_name: &str,
  input: &Array4<f32>,
) -> Result<ModelOutput, ModelError> {
  let tensor = TensorRef::from_array_view(input.view()).map_err(ModelError::InferenceError)?;

  let outputs = session
    .run(ort::inputs![input_name => tensor])
    .map_err(ModelError::InferenceError)?;

  let (shape, data) = outputs[output_name]
    .try_extract_tensor::<f32>()
    .map_err(ModelError::InferenceError)?;

  Ok(ModelOutput {
    shape: shape.iter().map(|&dim| dim as usize).collect(),
    data: data.to_vec(),
  })
}
