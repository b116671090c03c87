// 该文件是 Haishao （海哨） 项目的一部分。
// src/task.rs - 扫描任务
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
use std::time::Instant;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::detector::VesselDetector;
use crate::geo::{GeoBBox, GeoExporter};
use crate::output;
use crate::sentinel::{SceneOptions, SentinelDataSource};

/// 一次完整扫描：下载一幅场景、一次推理、一次导出
pub struct ScanTask {
  pub bbox: GeoBBox,
  pub time_range: (NaiveDate, NaiveDate),
  pub scene_options: SceneOptions,
  pub output: PathBuf,
  pub visualize: bool,
}

/// 扫描结果摘要
pub struct ScanReport {
  pub scene: PathBuf,
  pub vessel_count: usize,
  pub output: PathBuf,
}

impl ScanTask {
  pub fn new(bbox: GeoBBox, time_range: (NaiveDate, NaiveDate), output: PathBuf) -> Self {
    Self {
      bbox,
      time_range,
      scene_options: SceneOptions::default(),
      output,
      visualize: false,
    }
  }

  pub fn with_visualize(mut self, visualize: bool) -> Self {
    self.visualize = visualize;
    self
  }

  pub fn run(
    &self,
    source: &mut SentinelDataSource,
    detector: &mut VesselDetector,
  ) -> Result<ScanReport> {
    info!("开始扫描 {} ...", self.bbox);

    let now = Instant::now();
    let scene = source.get_scene(&self.bbox, self.time_range, &self.scene_options)?;
    info!("场景下载完成: {}，耗时: {:.2?}", scene.display(), now.elapsed());

    let now = Instant::now();
    let detections = detector.detect_file(&scene)?;
    info!(
      "推理完成，检测到 {} 艘船舶，耗时: {:.2?}",
      detections.len(),
      now.elapsed()
    );

    let image_size = (self.scene_options.size, self.scene_options.size);
    GeoExporter::detections_to_geojson(&detections, &self.bbox, image_size, &self.output)?;
    info!("GeoJSON 已保存: {}", self.output.display());

    if self.visualize {
      let preview = self.output.with_extension("png");
      output::save_annotated_scene(&scene, &detections, &preview)?;
    }

    Ok(ScanReport {
      scene,
      vessel_count: detections.len(),
      output: self.output.clone(),
    })
  }
}
