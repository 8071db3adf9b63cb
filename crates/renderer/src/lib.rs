//! Heatmap rendering for live scalar fields.
//!
//! Turns a mutable point set into colored frames clipped to a boundary:
//! - Colormap lookup tables
//! - Adaptive grid resolution driven by measured render time
//! - Fast pass on every change, debounced refinement pass afterwards
//! - Async layer actor publishing frames and render events
//! - PNG export

pub mod colormap;
pub mod config;
pub mod heatmap;
pub mod layer;
pub mod png;
pub mod quality;
pub mod refine;

pub use colormap::{Color, ColorLut, Colormap};
pub use config::{ColorRange, HeatmapConfig};
pub use heatmap::{colorize, HeatmapImage, HeatmapRenderer, RenderEvent, RenderPass};
pub use layer::{Frame, HeatmapLayer, LayerError, LayerHandle};
pub use png::{encode_image, write_png, PngError};
pub use quality::{AdaptiveQualityController, Quality, QualityLimits};
pub use refine::RefinementTimer;
