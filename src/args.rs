// 该文件是 Haishao （海哨） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::geo::GeoBBox;

/// Haishao 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 扫描指定海域，检测船舶并导出 GeoJSON
  Scan(ScanArgs),
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
  /// 地理范围: min_lon,min_lat,max_lon,max_lat（WGS84）
  #[arg(long, value_name = "BBOX")]
  pub bbox: GeoBBox,

  /// 起始日期: YYYY-MM-DD
  #[arg(long, value_name = "DATE")]
  pub date_start: NaiveDate,

  /// 结束日期: YYYY-MM-DD
  #[arg(long, value_name = "DATE")]
  pub date_end: NaiveDate,

  /// 输出 GeoJSON 文件路径
  #[arg(long, short = 'o', default_value = "vessels.geojson", value_name = "OUTPUT")]
  pub output: PathBuf,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.05", value_name = "THRESHOLD")]
  pub conf: f32,

  /// 保存叠加检测框的场景预览图（与输出同名的 PNG）
  #[arg(long)]
  pub visualize: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
    Args::try_parse_from(argv)
  }

  #[test]
  fn scan_args_parse() {
    let args = parse(&[
      "haishao",
      "scan",
      "--bbox",
      "5.85,43.08,6.05,43.18",
      "--date-start",
      "2026-01-01",
      "--date-end",
      "2026-01-31",
    ])
    .unwrap();

    let Command::Scan(scan) = args.command;
    assert_eq!(scan.bbox, "5.85,43.08,6.05,43.18".parse().unwrap());
    assert_eq!(scan.output, PathBuf::from("vessels.geojson"));
    assert_eq!(scan.conf, 0.05);
    assert!(!scan.visualize);
  }

  #[test]
  fn scan_custom_confidence() {
    let args = parse(&[
      "haishao",
      "scan",
      "--bbox",
      "5.85,43.08,6.05,43.18",
      "--date-start",
      "2026-01-01",
      "--date-end",
      "2026-01-31",
      "--conf",
      "0.25",
      "-o",
      "out/toulon.geojson",
      "--visualize",
    ])
    .unwrap();

    let Command::Scan(scan) = args.command;
    assert_eq!(scan.conf, 0.25);
    assert_eq!(scan.output, PathBuf::from("out/toulon.geojson"));
    assert!(scan.visualize);
  }

  #[test]
  fn scan_invalid_bbox_rejected() {
    let result = parse(&[
      "haishao",
      "scan",
      "--bbox",
      "invalid",
      "--date-start",
      "2026-01-01",
      "--date-end",
      "2026-01-31",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn scan_invalid_date_rejected() {
    let result = parse(&[
      "haishao",
      "scan",
      "--bbox",
      "5.85,43.08,6.05,43.18",
      "--date-start",
      "01/01/2026",
      "--date-end",
      "2026-01-31",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn scan_missing_required_rejected() {
    assert!(parse(&["haishao", "scan"]).is_err());
  }
}
