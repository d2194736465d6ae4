// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Zaoye 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 门控（棕榈叶判定）ONNX 模型文件路径
  #[arg(long, value_name = "FILE")]
  pub gate_model: PathBuf,

  /// 病害分类 ONNX 模型文件路径
  #[arg(long, value_name = "FILE")]
  pub disease_model: PathBuf,

  /// 输入图像路径
  /// 支持格式: *.jpg, *.jpeg, *.png, *.bmp, *.gif, *.webp
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,

  /// 标签集: palm4 (四分类), date8 (枣椰八分类), 或 JSON 标签文件路径
  #[arg(long, default_value = "palm4", value_name = "LABELS")]
  pub labels: String,

  /// 门控阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.3", value_name = "THRESHOLD")]
  pub gate_threshold: f32,

  /// 摘要中显著预测的最低置信度 (0.0 - 1.0)
  #[arg(long, default_value = "0.1", value_name = "THRESHOLD")]
  pub min_confidence: f32,

  /// 单次模型推理超时（毫秒，0 表示不限制）
  #[arg(long, default_value = "0", value_name = "MS")]
  pub timeout_ms: u64,

  /// 预测结果输出文件（JSON；省略则打印到标准输出）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<String>,
}

impl Args {
  pub fn timeout(&self) -> Option<Duration> {
    if self.timeout_ms == 0 {
      None
    } else {
      Some(Duration::from_millis(self.timeout_ms))
    }
  }
}
