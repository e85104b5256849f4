use std::fmt;
use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayD, ArrayView, Ix3};
use ndarray_npy::ReadNpyError;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::AFFINE_TOLERANCE;
use crate::error::LoadError;
use crate::{Affine, Idx3d};

pub mod mask;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 单位仿射矩阵.
const IDENTITY: Affine = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// 从 header 获取 (z, H, W) 形状. header 中以 \[W, H, z\] 记录.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 将 n 维数据的多余维度 (长度必须为 1) 去掉, 得到三维数组.
///
/// `data` 的最后三个维度必须已经是 (z, H, W) 顺序.
fn squeeze_to_3d(data: ArrayD<f32>) -> Result<Array3<f32>, LoadError> {
    let shape = data.shape().to_vec();
    let n = shape.len();
    if n < 3 || shape[..n - 3].iter().any(|&d| d != 1) {
        return Err(LoadError::NotVolume3d(shape));
    }
    let zhw = (shape[n - 3], shape[n - 2], shape[n - 1]);
    data.as_standard_layout()
        .into_owned()
        .into_shape(zhw)
        .map_err(|_| LoadError::NotVolume3d(shape))
}

/// 依次尝试以 `f32`, `f64`, `u8`, `bool` 读取 npy 文件, 统一转换为 `f32`.
fn read_npy_as_f32(path: &Path) -> Result<ArrayD<f32>, LoadError> {
    macro_rules! try_read {
        ($elem: ty, $conv: expr) => {
            match ndarray_npy::read_npy::<_, ArrayD<$elem>>(path) {
                Err(ReadNpyError::WrongDescriptor(_)) => {}
                other => return Ok(other?.mapv($conv)),
            }
        };
    }
    try_read!(f32, |v| v);
    try_read!(f64, |v| v as f32);
    try_read!(u8, f32::from);
    let data = ndarray_npy::read_npy::<_, ArrayD<bool>>(path)?;
    Ok(data.mapv(|v| if v { 1.0 } else { 0.0 }))
}

/// 根据 qform 四元数计算仿射矩阵. 参见 NIfTI-1 标准 "METHOD 2".
fn qform_affine(h: &NiftiHeader) -> Affine {
    let (b, c, d) = (
        h.quatern_b as f64,
        h.quatern_c as f64,
        h.quatern_d as f64,
    );
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let [_, dx, dy, dz, ..] = h.pixdim.map(f64::from);
    let r = [
        [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
        [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
        [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - c * c - b * b],
    ];
    let offset = [h.quatern_x, h.quatern_y, h.quatern_z].map(f64::from);
    let mut m = IDENTITY;
    for (i, row) in r.iter().enumerate() {
        m[i] = [row[0] * dx, row[1] * dy, row[2] * dz * qfac, offset[i]];
    }
    m
}

/// 从 header 获取体素到世界坐标的仿射矩阵.
///
/// 优先级: sform (`sform_code > 0`) > qform (`qform_code > 0`) > `pixdim` 对角阵.
fn affine_from_header(h: &NiftiHeader) -> Affine {
    if h.sform_code > 0 {
        let row = |r: &[f32; 4]| r.map(f64::from);
        [row(&h.srow_x), row(&h.srow_y), row(&h.srow_z), IDENTITY[3]]
    } else if h.qform_code > 0 {
        qform_affine(h)
    } else {
        let mut m = IDENTITY;
        for i in 0..3 {
            m[i][i] = h.pixdim[i + 1] as f64;
        }
        m
    }
}

/// 分割体积 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小, 按 (z, H, W) 顺序.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取体素索引 (i, j, k) = (W, H, z) 到世界坐标的仿射矩阵.
    #[inline]
    fn affine(&self) -> Affine {
        affine_from_header(self.header())
    }
}

/// 两个体积的体素对齐情况.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Alignment {
    /// 形状是否一致.
    pub shape_match: bool,

    /// 仿射矩阵是否在容差内一致.
    pub affine_match: bool,

    /// 仿射矩阵元素的最大绝对差.
    pub max_affine_diff: f64,
}

impl Alignment {
    /// 比较形状和仿射矩阵.
    pub fn between(shape_a: Idx3d, affine_a: &Affine, shape_b: Idx3d, affine_b: &Affine, tol: f64) -> Self {
        let max_affine_diff = affine_a
            .iter()
            .flatten()
            .zip(affine_b.iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        Self {
            shape_match: shape_a == shape_b,
            affine_match: max_affine_diff <= tol,
            max_affine_diff,
        }
    }

    /// 形状与仿射矩阵均一致, 即两个体积可以逐体素比较.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.shape_match && self.affine_match
    }
}

/// header 中与几何有关的信息摘要, 用于日志输出.
#[derive(Clone, Debug)]
pub struct HeaderSummary {
    /// (z, H, W) 形状.
    pub shape: Idx3d,

    /// (z, H, W) 体素分辨率.
    pub pix_dim: [f64; 3],

    /// qform 代码.
    pub qform_code: i16,

    /// sform 代码.
    pub sform_code: i16,

    /// 仿射矩阵.
    pub affine: Affine,
}

impl fmt::Display for HeaderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (z, h, w) = self.shape;
        let [pz, ph, pw] = self.pix_dim;
        writeln!(f, "shape (z, H, W): ({z}, {h}, {w})")?;
        writeln!(f, "pixdim (z, H, W): ({pz:.4}, {ph:.4}, {pw:.4}) mm")?;
        writeln!(f, "qform_code: {}, sform_code: {}", self.qform_code, self.sform_code)?;
        write!(f, "affine:")?;
        for row in self.affine.iter() {
            write!(f, "\n    [{:>10.4} {:>10.4} {:>10.4} {:>10.4}]", row[0], row[1], row[2], row[3])?;
        }
        Ok(())
    }
}

/// 三维分割体积, 包括 header 和体素值. 体素值以 `f32` 保存, 按 (z, H, W) 访问.
#[derive(Debug, Clone)]
pub struct SegVolume {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for SegVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for SegVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl SegVolume {
    /// 打开 nii (或 nii.gz) 文件格式的分割体积. `path` 为文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z, ..] -> [.., z, H, W].
        let data = obj.into_volume().into_ndarray::<f32>()?;
        let reversed: Vec<usize> = (0..data.ndim()).rev().collect();
        let data = squeeze_to_3d(data.permuted_axes(reversed))?;

        Ok(Self { header, data })
    }

    /// 打开 npy 文件格式的分割体积. 文件内数组按 (z, H, W) 行优先存储,
    /// 体素分辨率视为 1 mm, 仿射矩阵为单位阵.
    pub fn open_npy<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let data = squeeze_to_3d(read_npy_as_f32(path.as_ref())?)?;
        Ok(Self::fake_with_affine(data, &IDENTITY))
    }

    /// 根据 (z, H, W) 数据和 (z, H, W) 体素分辨率直接创建实体. 仿射矩阵为对角阵.
    ///
    /// # 注意
    ///
    /// 该方法创建的实体没有真实来源, 你应仅将其用于实验和测试目的.
    pub fn fake(data: Array3<f32>, pix_dim: [f32; 3]) -> Self {
        let [pz, ph, pw] = pix_dim.map(f64::from);
        let mut affine = IDENTITY;
        (affine[0][0], affine[1][1], affine[2][2]) = (pw, ph, pz);
        Self::fake_with_affine(data, &affine)
    }

    /// 根据 (z, H, W) 数据和仿射矩阵直接创建实体. 仿射矩阵写入 sform.
    pub fn fake_with_affine(data: Array3<f32>, affine: &Affine) -> Self {
        let mut header = Box::<NiftiHeader>::default();
        let (z, h, w) = data.dim();
        header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
        for (i, row) in affine.iter().take(3).enumerate() {
            let col_norm = (0..3).map(|r| affine[r][i].powi(2)).sum::<f64>().sqrt();
            header.pixdim[i + 1] = col_norm as f32;
            let srow = row.map(|v| v as f32);
            match i {
                0 => header.srow_x = srow,
                1 => header.srow_y = srow,
                _ => header.srow_z = srow,
            }
        }
        header.sform_code = 1;
        header.intent_name[..4].copy_from_slice(b"fake");
        Self { header, data }
    }

    /// 判断该结构是否是由 `fake_*` 方法手动拼接的.
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 与 `other` 比较体素对齐情况, 仿射矩阵容差为 `tol`.
    pub fn alignment_with_tolerance(&self, other: &Self, tol: f64) -> Alignment {
        Alignment::between(self.data.dim(), &self.affine(), other.data.dim(), &other.affine(), tol)
    }

    /// 与 `other` 比较体素对齐情况, 使用默认容差 [`AFFINE_TOLERANCE`].
    #[inline]
    pub fn alignment(&self, other: &Self) -> Alignment {
        self.alignment_with_tolerance(other, AFFINE_TOLERANCE)
    }

    /// 获取 header 几何信息摘要.
    pub fn header_summary(&self) -> HeaderSummary {
        HeaderSummary {
            shape: self.data.dim(),
            pix_dim: self.pix_dim(),
            qform_code: self.header.qform_code,
            sform_code: self.header.sform_code,
            affine: self.affine(),
        }
    }
}
