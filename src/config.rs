// 该文件是 Haishao （海哨） 项目的一部分。
// src/config.rs - 环境变量配置
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

use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_MODEL_PATH: &str = "models/yolo11s_tci.onnx";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUTPUT_DIR: &str = "runs";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.05;
const DEFAULT_PATCH_SIZE: u32 = 320;
const DEFAULT_PATCH_OVERLAP: f32 = 0.5;
const DEFAULT_DEVICE: &str = "0";
const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_BATCH_SIZE: usize = 8;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error(
    "Sentinel Hub 凭据未配置。\n请在 .env 中设置 SH_CLIENT_ID 与 SH_CLIENT_SECRET。\n凭据申请: https://apps.sentinel-hub.com/dashboard/#/account/settings"
  )]
  MissingCredentials,
}

/// Haishao 全局配置
#[derive(Debug, Clone)]
pub struct HaishaoConfig {
  /// ONNX 模型文件路径
  pub model_path: PathBuf,
  /// 场景下载目录
  pub data_dir: PathBuf,
  /// 运行结果目录
  pub output_dir: PathBuf,

  /// Sentinel Hub OAuth 客户端 ID
  pub sentinel_client_id: Option<String>,
  /// Sentinel Hub OAuth 客户端密钥
  pub sentinel_client_secret: Option<String>,

  /// 置信度阈值
  pub confidence_threshold: f32,
  /// 瓦片尺寸（像素）
  pub patch_size: u32,
  /// 瓦片重叠比例
  pub patch_overlap: f32,
  /// 推理设备（GPU 序号或 "cpu"）
  pub device: String,

  /// 最大工作线程数
  pub max_workers: usize,
  /// 推理批大小
  pub batch_size: usize,
}

impl Default for HaishaoConfig {
  fn default() -> Self {
    Self::from_env()
  }
}

impl HaishaoConfig {
  /// 从环境变量加载配置（.env 由 main 在进程启动时加载）
  pub fn from_env() -> Self {
    Self {
      model_path: PathBuf::from(
        env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string()),
      ),
      data_dir: PathBuf::from(DEFAULT_DATA_DIR),
      output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
      sentinel_client_id: env::var("SH_CLIENT_ID").ok(),
      sentinel_client_secret: env::var("SH_CLIENT_SECRET").ok(),
      confidence_threshold: env_parse("CONFIDENCE_THRESHOLD", DEFAULT_CONFIDENCE_THRESHOLD),
      patch_size: env_parse("PATCH_SIZE", DEFAULT_PATCH_SIZE),
      patch_overlap: env_parse("PATCH_OVERLAP", DEFAULT_PATCH_OVERLAP),
      device: env::var("DEVICE").unwrap_or_else(|_| DEFAULT_DEVICE.to_string()),
      max_workers: env_parse("MAX_WORKERS", DEFAULT_MAX_WORKERS),
      batch_size: env_parse("BATCH_SIZE", DEFAULT_BATCH_SIZE),
    }
  }

  /// 校验配置：模型文件必须存在，Sentinel Hub 凭据必须齐全
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.model_path.exists() {
      return Err(ConfigError::ModelNotFound(self.model_path.clone()));
    }

    let id_ok = self
      .sentinel_client_id
      .as_deref()
      .is_some_and(|v| !v.is_empty());
    let secret_ok = self
      .sentinel_client_secret
      .as_deref()
      .is_some_and(|v| !v.is_empty());
    if !id_ok || !secret_ok {
      return Err(ConfigError::MissingCredentials);
    }

    Ok(())
  }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
  env::var(key)
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(default)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Mutex, OnceLock};

  // 测试串行访问进程环境变量
  fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
  }

  const ALL_KEYS: [&str; 9] = [
    "MODEL_PATH",
    "SH_CLIENT_ID",
    "SH_CLIENT_SECRET",
    "CONFIDENCE_THRESHOLD",
    "PATCH_SIZE",
    "PATCH_OVERLAP",
    "DEVICE",
    "MAX_WORKERS",
    "BATCH_SIZE",
  ];

  fn clear_env() {
    for key in ALL_KEYS {
      unsafe { env::remove_var(key) };
    }
  }

  #[test]
  fn config_from_env() {
    let _guard = env_lock().lock().unwrap();
    clear_env();
    unsafe {
      env::set_var("SH_CLIENT_ID", "test-id-override");
      env::set_var("SH_CLIENT_SECRET", "test-secret-override");
      env::set_var("DEVICE", "cpu");
      env::set_var("CONFIDENCE_THRESHOLD", "0.1");
    }

    let config = HaishaoConfig::from_env();
    clear_env();

    assert_eq!(config.sentinel_client_id.as_deref(), Some("test-id-override"));
    assert_eq!(
      config.sentinel_client_secret.as_deref(),
      Some("test-secret-override")
    );
    assert_eq!(config.device, "cpu");
    assert_eq!(config.confidence_threshold, 0.1);
  }

  #[test]
  fn config_all_env_vars() {
    let _guard = env_lock().lock().unwrap();
    clear_env();
    unsafe {
      env::set_var("SH_CLIENT_ID", "test-id");
      env::set_var("SH_CLIENT_SECRET", "test-secret");
      env::set_var("CONFIDENCE_THRESHOLD", "0.25");
      env::set_var("PATCH_SIZE", "640");
      env::set_var("PATCH_OVERLAP", "0.75");
      env::set_var("MAX_WORKERS", "8");
      env::set_var("BATCH_SIZE", "16");
    }

    let config = HaishaoConfig::from_env();
    clear_env();

    assert_eq!(config.confidence_threshold, 0.25);
    assert_eq!(config.patch_size, 640);
    assert_eq!(config.patch_overlap, 0.75);
    assert_eq!(config.max_workers, 8);
    assert_eq!(config.batch_size, 16);
  }

  #[test]
  fn config_defaults() {
    let _guard = env_lock().lock().unwrap();
    clear_env();

    let config = HaishaoConfig::from_env();

    assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
    assert_eq!(config.data_dir, PathBuf::from("data"));
    assert_eq!(config.output_dir, PathBuf::from("runs"));
    assert_eq!(config.confidence_threshold, 0.05);
    assert_eq!(config.patch_size, 320);
    assert_eq!(config.patch_overlap, 0.5);
    assert_eq!(config.device, "0");
    assert_eq!(config.max_workers, 4);
    assert_eq!(config.batch_size, 8);
  }

  #[test]
  fn validation_missing_credentials() {
    let _guard = env_lock().lock().unwrap();
    clear_env();

    let mut config = HaishaoConfig::from_env();
    // 跳过模型检查，单独验证凭据分支
    config.model_path = PathBuf::from("Cargo.toml");

    assert!(matches!(
      config.validate(),
      Err(ConfigError::MissingCredentials)
    ));

    config.sentinel_client_id = Some("test-id".to_string());
    config.sentinel_client_secret = Some(String::new());
    assert!(matches!(
      config.validate(),
      Err(ConfigError::MissingCredentials)
    ));
  }

  #[test]
  fn validation_missing_model() {
    let _guard = env_lock().lock().unwrap();
    clear_env();

    let mut config = HaishaoConfig::from_env();
    config.sentinel_client_id = Some("test-id".to_string());
    config.sentinel_client_secret = Some("test-secret".to_string());
    config.model_path = PathBuf::from("models/does_not_exist.onnx");

    assert!(matches!(
      config.validate(),
      Err(ConfigError::ModelNotFound(_))
    ));
  }

  #[test]
  fn validation_success() {
    let _guard = env_lock().lock().unwrap();
    clear_env();

    let mut config = HaishaoConfig::from_env();
    config.sentinel_client_id = Some("test-id".to_string());
    config.sentinel_client_secret = Some("test-secret".to_string());
    // 任一存在的文件即可通过模型检查
    config.model_path = PathBuf::from("Cargo.toml");

    assert!(config.validate().is_ok());
  }
}
