// 该文件是 Haishao （海哨） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::info;

use crate::detector::Detection;

const BOX_COLOR: [u8; 3] = [255, 64, 64];
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}

/// 在图像上为每个检测绘制加粗边框
pub fn draw_detections(image: &mut RgbImage, detections: &[Detection]) {
  let (width, height) = (image.width() as i32, image.height() as i32);

  for detection in detections {
    let x_min = (detection.bbox[0].floor() as i32).clamp(0, width - 1);
    let y_min = (detection.bbox[1].floor() as i32).clamp(0, height - 1);
    let x_max = (detection.bbox[2].ceil() as i32).clamp(0, width - 1);
    let y_max = (detection.bbox[3].ceil() as i32).clamp(0, height - 1);

    if x_min >= x_max || y_min >= y_max {
      continue;
    }

    // 边框加粗为 2 像素
    for thickness in 0..BOX_THICKNESS {
      let x = x_min + thickness;
      let y = y_min + thickness;
      let w = x_max - x_min + 1 - 2 * thickness;
      let h = y_max - y_min + 1 - 2 * thickness;
      if w <= 0 || h <= 0 {
        break;
      }

      draw_hollow_rect_mut(
        image,
        Rect::at(x, y).of_size(w as u32, h as u32),
        Rgb(BOX_COLOR),
      );
    }
  }
}

/// 加载场景图像，叠加检测框后另存为 PNG
pub fn save_annotated_scene(
  scene_path: &Path,
  detections: &[Detection],
  output_path: &Path,
) -> Result<PathBuf, OutputError> {
  let mut image: RgbImage = image::ImageReader::open(scene_path)?.decode()?.into();

  draw_detections(&mut image, detections);

  if let Some(parent) = output_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  image.save(output_path)?;
  info!("标注图像已保存: {}", output_path.display());

  Ok(output_path.to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn draws_box_border() {
    let mut image = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
    let detections = vec![Detection::new([10.0, 10.0, 30.0, 30.0], 0.9, 0)];

    draw_detections(&mut image, &detections);

    // 边框像素被着色
    assert_eq!(*image.get_pixel(10, 10), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(30, 10), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(10, 30), Rgb(BOX_COLOR));
    // 第二圈加粗
    assert_eq!(*image.get_pixel(11, 11), Rgb(BOX_COLOR));
    // 内部保持原样
    assert_eq!(*image.get_pixel(20, 20), Rgb([0, 0, 0]));
    // 框外保持原样
    assert_eq!(*image.get_pixel(50, 50), Rgb([0, 0, 0]));
  }

  #[test]
  fn out_of_bounds_box_is_clamped() {
    let mut image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let detections = vec![Detection::new([-10.0, -10.0, 100.0, 100.0], 0.9, 0)];

    // 不越界崩溃即可
    draw_detections(&mut image, &detections);
    assert_eq!(*image.get_pixel(0, 0), Rgb(BOX_COLOR));
  }

  #[test]
  fn degenerate_box_is_skipped() {
    let mut image = RgbImage::from_pixel(32, 32, Rgb([7, 7, 7]));
    let detections = vec![Detection::new([10.0, 10.0, 10.0, 10.0], 0.9, 0)];

    draw_detections(&mut image, &detections);
    assert_eq!(*image.get_pixel(10, 10), Rgb([7, 7, 7]));
  }
}
