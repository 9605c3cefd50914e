//! Image operations on top of the execution core.
//!
//! | Operation | Tool |
//! |---|---|
//! | **Identify** | `identify -format ...` (both suites) |
//! | **Convert** | `convert` (ImageMagick) or `gm convert` (GraphicsMagick) |
//! | **Rotated size** | computed locally, no tool run |
//!
//! The module is split into:
//! - **Calculations**: pure rotated-bounding-box math (unit testable)
//! - **Identify**: the identify output contract and its parser
//! - **Parameters**: quality and post-processing added to every convert
//! - **Toolkit**: [`MagickToolkit`] combining the above with the execution manager

mod calculations;
pub mod identify;
mod params;
pub mod toolkit;

pub use calculations::{
    DEFAULT_IMPRECISION, DEFAULT_TOLERANCE, RotationModel, fix_imprecision, rotated_bounding_box,
    rotated_dimensions,
};
pub use identify::{
    FrameInfo, IDENTIFY_FORMAT, ImageInfo, SUPPORTED_FORMATS, is_supported_format,
    parse_identify_output,
};
pub use params::{PostProcessing, Quality};
pub use toolkit::MagickToolkit;
