//! 二值掩膜.

use std::collections::VecDeque;
use std::path::Path;

use ndarray::{Array2, Array3, ArrayView, Axis, Ix3};

use crate::consts::ElemType;
use crate::data::{NiftiHeaderAttr, SegVolume, IDENTITY};
use crate::error::ReportError;
use crate::{Affine, Idx3d};

/// 分割体积按阈值二值化后的结果. 保留原体积的仿射矩阵以便对齐检查.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    affine: Affine,
    data: Array3<bool>,
}

/// 连通分量统计.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ComponentReport {
    /// 6-连通前景分量个数.
    pub count: usize,

    /// 最大分量的体素个数. 不存在前景时为 0.
    pub largest: usize,
}

impl ComponentReport {
    /// 是否只有唯一的前景分量 (通常意味着分割干净, 没有噪点).
    #[inline]
    pub fn is_single(&self) -> bool {
        self.count == 1
    }
}

/// 最大强度投影的方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProjectionAxis {
    /// 沿相邻切片方向投影, 得到 (H, W) 图像.
    Z,

    /// 沿高方向投影, 得到 (z, W) 图像.
    Height,

    /// 沿宽方向投影, 得到 (z, H) 图像.
    Width,
}

impl ProjectionAxis {
    #[inline]
    fn axis(self) -> Axis {
        match self {
            ProjectionAxis::Z => Axis(0),
            ProjectionAxis::Height => Axis(1),
            ProjectionAxis::Width => Axis(2),
        }
    }
}

impl BinaryMask {
    /// 将 `volume` 中大于 [`crate::consts::MASK_THRESHOLD`] 的体素视为前景.
    pub fn from_volume(volume: &SegVolume) -> Self {
        Self {
            affine: volume.affine(),
            data: volume.data().mapv(|v| ElemType::classify(v).is_foreground()),
        }
    }

    /// 将 `volume` 中大于 `threshold` 的体素视为前景.
    pub fn from_volume_with(volume: &SegVolume, threshold: f32) -> Self {
        Self {
            affine: volume.affine(),
            data: volume.data().mapv(|v| v > threshold),
        }
    }

    /// 直接从 (z, H, W) 布尔数组创建掩膜. 仿射矩阵为单位阵.
    #[inline]
    pub fn from_array(data: Array3<bool>) -> Self {
        Self {
            affine: IDENTITY,
            data,
        }
    }

    /// 获取 (z, H, W) 形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取仿射矩阵.
    #[inline]
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, bool, Ix3> {
        self.data.view()
    }

    /// 前景体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 是否不存在前景体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|p| *p)
    }

    /// 统计 6-连通 (前后上下左右) 前景分量.
    ///
    /// 多于一个分量通常说明分割中存在孤立噪点.
    pub fn components(&self) -> ComponentReport {
        let mut visited = Array3::<bool>::from_elem(self.shape(), false);
        let mut queue = VecDeque::new();
        let mut report = ComponentReport {
            count: 0,
            largest: 0,
        };

        for (pos, _) in self.data.indexed_iter().filter(|(_, p)| **p) {
            if visited[pos] {
                continue;
            }
            visited[pos] = true;
            queue.push_back(pos);
            let mut size = 0usize;
            while let Some(cur) = queue.pop_front() {
                size += 1;
                for n in self.diamond_neighbours(cur) {
                    if self.data[n] && !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }
            report.count += 1;
            report.largest = report.largest.max(size);
        }
        report
    }

    /// 沿 `axis` 方向做最大强度投影.
    pub fn max_projection(&self, axis: ProjectionAxis) -> Array2<bool> {
        self.data.fold_axis(axis.axis(), false, |acc, p| *acc || *p)
    }

    /// 将最大强度投影保存为灰度图. 前景为白色, 背景为黑色.
    pub fn save_projection<P: AsRef<Path>>(
        &self,
        path: P,
        axis: ProjectionAxis,
    ) -> Result<(), ReportError> {
        let proj = self.max_projection(axis);
        let (height, width) = proj.dim();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in proj.indexed_iter() {
            let gray = if pix { u8::MAX } else { u8::MIN };
            buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
        }
        buf.save(path)?;
        Ok(())
    }

    /// 获取 `pos` 前后上下左右六个点的坐标.
    ///
    /// 在数据范围外的坐标会被过滤掉, 不会包含在返回值中.
    fn diamond_neighbours(&self, (z, h, w): Idx3d) -> impl Iterator<Item = Idx3d> {
        let (lz, lh, lw) = self.shape();
        [
            (z.wrapping_sub(1), h, w),
            (z.saturating_add(1), h, w),
            (z, h.wrapping_sub(1), w),
            (z, h.saturating_add(1), w),
            (z, h, w.wrapping_sub(1)),
            (z, h, w.saturating_add(1)),
        ]
        .into_iter()
        .filter(move |&(z0, h0, w0)| z0 < lz && h0 < lh && w0 < lw)
    }
}
