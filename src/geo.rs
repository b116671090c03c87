// 该文件是 Haishao （海哨） 项目的一部分。
// src/geo.rs - 坐标变换与 GeoJSON 导出
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

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::json;
use thiserror::Error;

use crate::detector::Detection;

#[derive(Error, Debug)]
pub enum GeoError {
  #[error("bbox 格式错误: {0}（期望 min_lon,min_lat,max_lon,max_lat）")]
  InvalidBBox(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// WGS84 地理范围 (min_lon, min_lat, max_lon, max_lat)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBBox {
  pub min_lon: f64,
  pub min_lat: f64,
  pub max_lon: f64,
  pub max_lat: f64,
}

impl GeoBBox {
  pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, GeoError> {
    let bbox = Self {
      min_lon,
      min_lat,
      max_lon,
      max_lat,
    };

    if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
      return Err(GeoError::InvalidBBox(format!("经度超出范围: {bbox}")));
    }
    if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
      return Err(GeoError::InvalidBBox(format!("纬度超出范围: {bbox}")));
    }
    if min_lon >= max_lon || min_lat >= max_lat {
      return Err(GeoError::InvalidBBox(format!("范围上下界颠倒: {bbox}")));
    }

    Ok(bbox)
  }
}

impl FromStr for GeoBBox {
  type Err = GeoError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<f64> = s
      .split(',')
      .map(|p| p.trim().parse::<f64>())
      .collect::<Result<_, _>>()
      .map_err(|_| GeoError::InvalidBBox(s.to_string()))?;

    if parts.len() != 4 {
      return Err(GeoError::InvalidBBox(s.to_string()));
    }

    Self::new(parts[0], parts[1], parts[2], parts[3])
  }
}

impl fmt::Display for GeoBBox {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "({}, {}, {}, {})",
      self.min_lon, self.min_lat, self.max_lon, self.max_lat
    )
  }
}

/// 像素坐标 → WGS84 经纬度的线性插值。
/// 图像顶部对应 max_lat，y 轴方向与纬度相反。
pub fn pixel_to_geo(x_px: f64, y_px: f64, bbox: &GeoBBox, image_size: (u32, u32)) -> (f64, f64) {
  let (width, height) = image_size;

  let lon = bbox.min_lon + (x_px / width as f64) * (bbox.max_lon - bbox.min_lon);
  let lat = bbox.max_lat - (y_px / height as f64) * (bbox.max_lat - bbox.min_lat);

  (lon, lat)
}

/// 检测结果的地理格式导出
pub struct GeoExporter;

impl GeoExporter {
  /// 将像素坐标系下的检测结果导出为 GeoJSON 点要素集合。
  /// 每个检测取其中心点，属性为 {id, confidence, class}。
  pub fn detections_to_geojson(
    detections: &[Detection],
    bbox: &GeoBBox,
    image_size: (u32, u32),
    output_path: &Path,
  ) -> Result<PathBuf, GeoError> {
    let features: Vec<serde_json::Value> = detections
      .iter()
      .enumerate()
      .map(|(idx, detection)| {
        let (lon, lat) = pixel_to_geo(
          detection.center[0] as f64,
          detection.center[1] as f64,
          bbox,
          image_size,
        );

        json!({
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [lon, lat] },
          "properties": {
            "id": idx,
            "confidence": detection.confidence,
            "class": detection.class_name,
          },
        })
      })
      .collect();

    let geojson = json!({
      "type": "FeatureCollection",
      "features": features,
    });

    if let Some(parent) = output_path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, serde_json::to_string_pretty(&geojson)?)?;

    Ok(output_path.to_path_buf())
  }
}
