// 该文件是 Haishao （海哨） 项目的一部分。
// src/sentinel.rs - Sentinel-2 L1C 场景获取（Sentinel Hub API）
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

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::HaishaoConfig;
use crate::geo::GeoBBox;

const TOKEN_URL: &str =
  "https://services.sentinel-hub.com/auth/realms/main/protocol/openid-connect/token";
const PROCESS_URL: &str = "https://services.sentinel-hub.com/api/v1/process";

const DEFAULT_SCENE_SIZE: u32 = 1024;
const DEFAULT_MAX_CLOUD_COVERAGE: f64 = 0.2;

// L1C TCI RGB（与 yolo11s_tci 训练数据一致）
const EVALSCRIPT: &str = "return [B04, B03, B02];";

#[derive(Error, Debug)]
pub enum SentinelError {
  #[error("Sentinel Hub 凭据未配置")]
  MissingCredentials,
  #[error("认证失败: {0}")]
  Auth(String),
  #[error("HTTP 错误: {0}")]
  Http(#[from] reqwest::Error),
  #[error("图像解码错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}

/// 场景获取选项
#[derive(Debug, Clone)]
pub struct SceneOptions {
  /// 输出边长（正方形，像素）
  pub size: u32,
  /// 最大云量比例 (0.0 - 1.0)
  pub max_cloud_coverage: f64,
  /// 显式输出路径；缺省时保存到 data_dir 下带时间戳的文件
  pub output_path: Option<PathBuf>,
}

impl Default for SceneOptions {
  fn default() -> Self {
    Self {
      size: DEFAULT_SCENE_SIZE,
      max_cloud_coverage: DEFAULT_MAX_CLOUD_COVERAGE,
      output_path: None,
    }
  }
}

/// Sentinel-2 L1C 数据获取客户端
pub struct SentinelDataSource {
  client: Client,
  client_id: String,
  client_secret: String,
  data_dir: PathBuf,
  access_token: Option<String>,
}

impl SentinelDataSource {
  /// 从配置创建客户端
  pub fn new(config: &HaishaoConfig) -> Result<Self, SentinelError> {
    Self::with_credentials(
      config.sentinel_client_id.clone().unwrap_or_default(),
      config.sentinel_client_secret.clone().unwrap_or_default(),
      config.data_dir.clone(),
    )
  }

  /// 用显式凭据创建客户端
  pub fn with_credentials(
    client_id: String,
    client_secret: String,
    data_dir: PathBuf,
  ) -> Result<Self, SentinelError> {
    if client_id.is_empty() || client_secret.is_empty() {
      return Err(SentinelError::MissingCredentials);
    }

    Ok(Self {
      client: Client::new(),
      client_id,
      client_secret,
      data_dir,
      access_token: None,
    })
  }

  /// OAuth2 client_credentials 认证，令牌在首次请求前惰性获取
  fn authenticate(&mut self) -> Result<String, SentinelError> {
    if let Some(token) = &self.access_token {
      return Ok(token.clone());
    }

    debug!("正在获取 Sentinel Hub 访问令牌...");
    let response: Value = self
      .client
      .post(TOKEN_URL)
      .form(&[
        ("grant_type", "client_credentials"),
        ("client_id", self.client_id.as_str()),
        ("client_secret", self.client_secret.as_str()),
      ])
      .send()?
      .error_for_status()?
      .json()?;

    let token = response["access_token"]
      .as_str()
      .ok_or_else(|| SentinelError::Auth("响应缺少 access_token".to_string()))?
      .to_string();

    self.access_token = Some(token.clone());
    Ok(token)
  }

  /// 下载 Sentinel-2 L1C RGB 场景（大气层顶），按最少云量镶嵌。
  /// 返回保存的 PNG 路径。
  pub fn get_scene(
    &mut self,
    bbox: &GeoBBox,
    time_range: (NaiveDate, NaiveDate),
    options: &SceneOptions,
  ) -> Result<PathBuf, SentinelError> {
    let token = self.authenticate()?;
    let body = process_request_body(bbox, time_range, options.size, options.max_cloud_coverage);

    debug!("正在请求场景: bbox={} size={}", bbox, options.size);
    let bytes = self
      .client
      .post(PROCESS_URL)
      .bearer_auth(token)
      .json(&body)
      .send()?
      .error_for_status()?
      .bytes()?;

    // 解码校验响应载荷确为图像
    let image = image::load_from_memory(&bytes)?;

    let output_path = match &options.output_path {
      Some(path) => path.clone(),
      None => scene_path(&self.data_dir, Utc::now()),
    };

    if let Some(parent) = output_path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    image.save(&output_path)?;
    info!("场景已保存: {}", output_path.display());

    Ok(output_path)
  }
}

/// 构造 Process API 请求体。云量在接口侧为比例，线上协议为百分比。
fn process_request_body(
  bbox: &GeoBBox,
  time_range: (NaiveDate, NaiveDate),
  size: u32,
  max_cloud_coverage: f64,
) -> Value {
  json!({
    "input": {
      "bounds": {
        "bbox": [bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat],
        "properties": { "crs": "http://www.opengis.net/def/crs/EPSG/0/4326" },
      },
      "data": [{
        "type": "sentinel-2-l1c",
        "dataFilter": {
          "timeRange": {
            "from": format!("{}T00:00:00Z", time_range.0),
            "to": format!("{}T23:59:59Z", time_range.1),
          },
          "maxCloudCoverage": max_cloud_coverage * 100.0,
          "mosaickingOrder": "leastCC",
        },
      }],
    },
    "output": {
      "width": size,
      "height": size,
      "responses": [{
        "identifier": "default",
        "format": { "type": "image/png" },
      }],
    },
    "evalscript": EVALSCRIPT,
  })
}

/// data_dir/sentinel2_l1c_<时间戳>.png
fn scene_path(data_dir: &Path, at: DateTime<Utc>) -> PathBuf {
  data_dir.join(format!("sentinel2_l1c_{}.png", at.format("%Y%m%d_%H%M%S")))
}
