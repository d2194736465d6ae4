// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/output/mod.rs - 结果输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::cascade::CascadeOutcome;

/// 结果写入器 trait
pub trait ResultWriter {
  /// 写入一张图像的级联结果
  fn write_result(&mut self, image: &str, outcome: &CascadeOutcome) -> Result<()>;

  /// 完成写入
  fn finish(&mut self) -> Result<()>;
}

/// 标准输出写入器
pub struct StdoutWriter;

impl ResultWriter for StdoutWriter {
  fn write_result(&mut self, image: &str, outcome: &CascadeOutcome) -> Result<()> {
    match outcome {
      CascadeOutcome::Rejected { probability } => {
        println!(
          "{}: 不是棕榈叶 (门控概率 {:.2}%)",
          image,
          probability * 100.0
        );
      }
      CascadeOutcome::Classified { predictions } => {
        println!("{}: 检出 {} 个类别", image, predictions.len());
        for prediction in predictions {
          println!(
            "  - {}: {:.2}% (类别 {})",
            prediction.disease,
            prediction.confidence * 100.0,
            prediction.class_index
          );
        }
      }
    }
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}

/// JSON 文件写入器：累积所有记录，完成时一次性写出
pub struct JsonWriter {
  path: PathBuf,
  records: Vec<serde_json::Value>,
}

impl JsonWriter {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    JsonWriter {
      path: path.into(),
      records: Vec::new(),
    }
  }
}

impl ResultWriter for JsonWriter {
  fn write_result(&mut self, image: &str, outcome: &CascadeOutcome) -> Result<()> {
    let mut record = serde_json::to_value(outcome).context("无法序列化级联结果")?;
    if let Some(object) = record.as_object_mut() {
      object.insert("image".to_string(), serde_json::Value::from(image));
    }
    self.records.push(record);
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
    }

    let body = serde_json::to_string_pretty(&self.records)?;
    std::fs::write(&self.path, body)
      .with_context(|| format!("无法写入输出文件: {}", self.path.display()))?;

    warn!("保存预测结果到文件: {}", self.path.display());
    Ok(())
  }
}

/// 创建结果写入器：省略路径打印到标准输出，否则按扩展名分发
pub fn create_result_writer(output: Option<&str>) -> Result<Box<dyn ResultWriter>> {
  match output {
    None => Ok(Box::new(StdoutWriter)),
    Some(path) if path.to_lowercase().ends_with(".json") => Ok(Box::new(JsonWriter::new(path))),
    Some(path) => bail!("输出文件仅支持 JSON 格式: {}", path),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cascade::Prediction;

  fn classified() -> CascadeOutcome {
    CascadeOutcome::Classified {
      predictions: vec![
        Prediction {
          disease: "healthy".to_string(),
          confidence: 0.6,
          class_index: 1,
        },
        Prediction {
          disease: "pest".to_string(),
          confidence: 0.4,
          class_index: 3,
        },
      ],
    }
  }

  #[test]
  fn outcome_serialization_shape() {
    let value = serde_json::to_value(classified()).unwrap();
    assert_eq!(value["status"], "classified");
    assert_eq!(value["predictions"][0]["disease"], "healthy");
    assert_eq!(value["predictions"][0]["class_index"], 1);

    let rejected = serde_json::to_value(CascadeOutcome::Rejected { probability: 0.25 }).unwrap();
    assert_eq!(rejected["status"], "rejected");
    assert!(rejected["probability"].as_f64().is_some());
  }

  #[test]
  fn json_writer_writes_records() {
    let path = std::env::temp_dir().join(format!("zaoye-output-{}.json", std::process::id()));
    let mut writer = JsonWriter::new(&path);
    writer.write_result("leaf.png", &classified()).unwrap();
    writer
      .write_result("stone.png", &CascadeOutcome::Rejected { probability: 0.1 })
      .unwrap();
    writer.finish().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    assert_eq!(parsed[0]["image"], "leaf.png");
    assert_eq!(parsed[1]["status"], "rejected");
  }

  #[test]
  fn writer_dispatch_by_extension() {
    assert!(create_result_writer(None).is_ok());
    assert!(create_result_writer(Some("out/predictions.JSON")).is_ok());
    assert!(create_result_writer(Some("predictions.csv")).is_err());
  }
}
