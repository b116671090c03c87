// 该文件是 Haishao （海哨） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use anyhow::Result;
use clap::Parser;
use tracing::info;

use haishao::args::{Args, Command, ScanArgs};
use haishao::config::HaishaoConfig;
use haishao::detector::VesselDetector;
use haishao::sentinel::SentinelDataSource;
use haishao::task::ScanTask;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();
  dotenvy::dotenv().ok();

  let args = Args::parse();

  match args.command {
    Command::Scan(scan) => run_scan(scan),
  }
}

fn run_scan(args: ScanArgs) -> Result<()> {
  let mut config = HaishaoConfig::from_env();
  config.confidence_threshold = args.conf;
  config.validate()?;

  info!("模型文件路径: {}", config.model_path.display());
  info!("扫描范围: {}", args.bbox);
  info!("时间范围: {} ~ {}", args.date_start, args.date_end);
  info!("置信度阈值: {}", config.confidence_threshold);

  info!("正在加载模型...");
  let mut detector = VesselDetector::new(
    &config.model_path,
    &config.device,
    config.confidence_threshold,
  )?;
  info!("模型加载完成，推理设备: {}", detector.device());

  let mut source = SentinelDataSource::new(&config)?;

  let task = ScanTask::new(args.bbox, (args.date_start, args.date_end), args.output)
    .with_visualize(args.visualize);
  let report = task.run(&mut source, &mut detector)?;

  info!("扫描完成: 共检测到 {} 艘船舶", report.vessel_count);
  info!("输出文件: {}", report.output.display());

  Ok(())
}
