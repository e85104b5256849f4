//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Affine, Idx3d};

pub use crate::{Alignment, BinaryMask, ComponentReport, HeaderSummary, NiftiHeaderAttr};
pub use crate::{ProjectionAxis, SegVolume};

pub use crate::consts::{ElemType, AFFINE_TOLERANCE, CANONICAL_PHASES, MASK_THRESHOLD};

pub use crate::overlap::{dice_score, overlap_counts, OverlapCounts, ShapeMismatch};

#[cfg(feature = "rayon")]
pub use crate::overlap::par_dice_score;

pub use crate::phase::PhaseOrder;
pub use crate::record::{CoordAxis, StructureRecord, StructureTable};

pub use crate::displacement::{
    absolute_magnitude, relative_displacement, DisplacementResult, OrderBy, OrderKey,
};

pub use crate::compare::{
    common_structures, compare_folder, compare_structures, compare_structures_with,
    verify_structure, ComparisonResult, ComparisonSide, FallbackResolver, FileLoader,
    PatientDirResolver, Score, SegResolver, VolumeLoader,
};

pub use crate::AnalysisConfig;
