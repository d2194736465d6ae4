// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/bin/evaluate_gate.rs - 门控模型评估程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use zaoye::eval::{LabeledImageDir, evaluate_gate};
use zaoye::model::GateModelBuilder;

/// Zaoye 门控模型评估参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 门控（棕榈叶判定）ONNX 模型文件路径
  #[arg(long, value_name = "FILE")]
  pub model: PathBuf,

  /// 数据集根目录，包含两个按类别划分的子目录
  #[arg(long, value_name = "DIR")]
  pub data: PathBuf,

  /// 判定阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub threshold: f32,

  /// 正类子目录名（默认取字典序第二个子目录）
  #[arg(long, value_name = "CLASS")]
  pub positive: Option<String>,

  /// 评估报告输出文件（JSON）
  #[arg(long, value_name = "REPORT")]
  pub report: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  println!("Zaoye 门控模型评估");
  println!("==================");
  println!("模型文件: {}", args.model.display());
  println!("数据目录: {}", args.data.display());
  println!("判定阈值: {}", args.threshold);
  println!();

  println!("正在加载模型...");
  let gate = GateModelBuilder::new(&args.model)
    .threshold(args.threshold)
    .build()
    .context("门控模型加载失败")?;
  println!("模型加载完成");

  let dataset = LabeledImageDir::open(&args.data, args.positive.as_deref())
    .with_context(|| format!("无法打开数据集目录: {}", args.data.display()))?;
  println!(
    "样本数: {} (负类 {}, 正类 {})",
    dataset.len(),
    dataset.class_names()[0],
    dataset.class_names()[1]
  );
  println!();

  println!("开始评估...");
  let now = std::time::Instant::now();
  let report = evaluate_gate(&gate, &dataset, args.threshold)?;
  println!("评估完成, 耗时: {:.2?}", now.elapsed());
  println!();

  println!("混淆矩阵 (正类: {}):", report.classes[1]);
  println!(
    "  TP {:6}  FN {:6}",
    report.true_positive, report.false_negative
  );
  println!(
    "  FP {:6}  TN {:6}",
    report.false_positive, report.true_negative
  );
  println!();
  println!("准确率:  {:.4}", report.accuracy);
  println!("精确率:  {:.4}", report.precision);
  println!("召回率:  {:.4}", report.recall);
  println!("F1:      {:.4}", report.f1);
  match report.roc_auc {
    Some(auc) => println!("ROC-AUC: {:.4}", auc),
    None => println!("ROC-AUC: 不适用（数据集只含单一类别）"),
  }
  if report.skipped > 0 {
    println!("跳过 {} 张无法解码的图像", report.skipped);
  }

  if let Some(path) = &args.report {
    let body = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, body)
      .with_context(|| format!("无法写入评估报告: {}", path.display()))?;
    println!();
    println!("评估报告已保存: {}", path.display());
  }

  Ok(())
}
