// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Context, Result};
use clap::Parser;

use zaoye::cascade::{CascadeOutcome, CascadePredictor, summarize};
use zaoye::input::ImageInput;
use zaoye::model::{DiseaseModelBuilder, GateModelBuilder, LabelSet};
use zaoye::output::create_result_writer;

fn load_label_set(selector: &str) -> Result<LabelSet> {
  match selector {
    "palm4" => Ok(LabelSet::palm_stage()),
    "date8" => Ok(LabelSet::date_palm()),
    path => LabelSet::from_json_file(std::path::Path::new(path))
      .with_context(|| format!("无法加载标签文件: {}", path)),
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  println!("Zaoye 棕榈叶病害分类");
  println!("====================");
  println!("门控模型: {}", args.gate_model.display());
  println!("病害模型: {}", args.disease_model.display());
  println!("输入图像: {}", args.input.display());
  println!("门控阈值: {}", args.gate_threshold);
  println!();

  let labels = load_label_set(&args.labels)?;
  println!("标签集: {} 类", labels.len());

  // 加载模型（一次加载，之后只读共享）
  println!("正在加载模型...");
  let gate = GateModelBuilder::new(&args.gate_model)
    .threshold(args.gate_threshold)
    .timeout(args.timeout())
    .build()
    .context("门控模型加载失败")?;
  let disease = DiseaseModelBuilder::new(&args.disease_model, labels.len())
    .timeout(args.timeout())
    .build()
    .context("病害模型加载失败")?;
  let predictor = CascadePredictor::new(gate, disease, labels);
  println!("模型加载完成");
  println!();

  // 运行级联推理
  println!("开始推理...");
  let now = std::time::Instant::now();
  let outcome = predictor.predict(ImageInput::File(args.input.clone()))?;
  println!("推理完成, 耗时: {:.2?}", now.elapsed());
  println!();

  let mut writer = create_result_writer(args.output.as_deref())?;
  writer.write_result(&args.input.display().to_string(), &outcome)?;
  writer.finish()?;

  if let CascadeOutcome::Classified { predictions } = &outcome
    && let Some(summary) = summarize(predictions, args.min_confidence)
  {
    println!();
    println!(
      "最可能: {} ({:.2}%)",
      summary.top_prediction.disease,
      summary.top_prediction.confidence * 100.0
    );
    println!(
      "置信度不低于 {:.2} 的预测共 {} 条",
      args.min_confidence, summary.prediction_count
    );
  }

  Ok(())
}
