//! Synchronous heatmap renderer.
//!
//! Owns the interpolator cache, the adaptive quality controller and the
//! latest frame. Every data or configuration change renders a fast
//! low-resolution pass immediately and raises a refinement request; the
//! host debounces those requests (see [`crate::refine::RefinementTimer`])
//! and calls [`HeatmapRenderer::refine`] once the changes settle.
//!
//! ```text
//! working points ──► InterpolatorCache ──► FittedInterpolator::evaluate
//!                                                  │
//!                      color range (fixed | auto) ─┤
//!                                                  ▼
//!                               256-entry LUT ─► RGBA frame (NaN ─► transparent)
//! ```

use std::collections::HashSet;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use field_common::{BoundaryShape, BoundingBox, FieldError, FieldResult, Point2, PointSet, Polygon};
use interpolation::{CacheStats, InterpolatorCache, Kernel};

use crate::colormap::{Color, ColorLut, Colormap};
use crate::config::{ColorRange, HeatmapConfig};
use crate::quality::{AdaptiveQualityController, Quality};

/// Fewer working points than this suppress the frame.
pub const MIN_RENDER_POINTS: usize = 3;

/// Rows in parallel above this many pixels.
const PARALLEL_PIXELS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPass {
    /// Low resolution, rendered synchronously with the change.
    Fast,
    /// Full adaptive resolution, rendered after the changes settle.
    Refined,
}

impl std::fmt::Display for RenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderPass::Fast => write!(f, "fast"),
            RenderPass::Refined => write!(f, "refined"),
        }
    }
}

/// Emitted after every completed render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderEvent {
    pub duration_ms: f64,
    pub grid_size: usize,
    pub pass: RenderPass,
}

/// An RGBA frame and where it sits in data coordinates.
///
/// Pixel row 0 corresponds to `bounds.min_y`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapImage {
    pub width: usize,
    pub height: usize,
    /// RGBA, 4 bytes per pixel, row-major.
    pub pixels: Vec<u8>,
    pub bounds: BoundingBox,
    pub grid_size: usize,
    pub pass: RenderPass,
}

impl HeatmapImage {
    pub fn pixel(&self, col: usize, row: usize) -> Option<Color> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let i = (row * self.width + col) * 4;
        Some(Color::new(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }
}

/// Map grid values through `lut` after normalizing against `[min, max]`.
///
/// Values outside the range clamp to the end colors; NaN becomes fully
/// transparent.
pub fn colorize(values: &[f64], lut: &ColorLut, min: f64, max: f64) -> Vec<u8> {
    let span = max - min;
    let span = if span > 0.0 { span } else { 1.0 };
    let mut pixels = vec![0u8; values.len() * 4];

    let paint = |(px, v): (&mut [u8], &f64)| {
        let color = if v.is_nan() {
            Color::transparent()
        } else {
            lut.map((v - min) / span)
        };
        px.copy_from_slice(&color.to_array());
    };

    if values.len() >= PARALLEL_PIXELS {
        pixels.par_chunks_mut(4).zip(values.par_iter()).for_each(paint);
    } else {
        pixels.chunks_mut(4).zip(values.iter()).for_each(paint);
    }
    pixels
}

pub struct HeatmapRenderer {
    config: HeatmapConfig,
    lut: ColorLut,
    cache: InterpolatorCache,
    controller: AdaptiveQualityController,
    data: PointSet,
    excluded: HashSet<usize>,
    boundary: Option<Polygon>,
    auto_fit: bool,
    image: Option<HeatmapImage>,
    refinement_requested: bool,
}

impl HeatmapRenderer {
    pub fn new(config: HeatmapConfig) -> FieldResult<Self> {
        config.validate()?;
        Ok(Self {
            lut: config.colormap.lut(),
            cache: InterpolatorCache::new(config.cache_size, config.rbf_settings()),
            controller: AdaptiveQualityController::new(
                config.initial_grid_size,
                Some(config.target_ms()),
                config.quality_limits(),
            ),
            data: PointSet::default(),
            excluded: HashSet::new(),
            boundary: None,
            auto_fit: true,
            image: None,
            refinement_requested: false,
            config,
        })
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Replace the point data (typically from a container notification).
    pub fn update_data(&mut self, data: PointSet) -> Option<RenderEvent> {
        self.data = data;
        self.changed()
    }

    pub fn data(&self) -> &PointSet {
        &self.data
    }

    /// Points and values that survive the excluded-index filter.
    pub fn working_data(&self) -> (Vec<Point2>, Vec<f64>) {
        self.data.subset_excluding(&self.excluded)
    }

    pub fn excluded_indices(&self) -> &HashSet<usize> {
        &self.excluded
    }

    pub fn set_excluded_indices(&mut self, indices: impl IntoIterator<Item = usize>) -> Option<RenderEvent> {
        self.excluded = indices.into_iter().collect();
        self.changed()
    }

    pub fn add_excluded_index(&mut self, index: usize) -> Option<RenderEvent> {
        self.excluded.insert(index);
        self.changed()
    }

    /// Re-renders only when `index` was excluded.
    pub fn remove_excluded_index(&mut self, index: usize) -> Option<RenderEvent> {
        if !self.excluded.remove(&index) {
            return None;
        }
        self.changed()
    }

    pub fn clear_excluded_indices(&mut self) -> Option<RenderEvent> {
        self.excluded.clear();
        self.changed()
    }

    // ========================================================================
    // Boundary
    // ========================================================================

    /// Use `shape` as the boundary and turn auto-fit off.
    pub fn set_boundary(&mut self, shape: &BoundaryShape) -> FieldResult<Option<RenderEvent>> {
        let polygon = shape.to_polygon()?;
        Ok(self.set_boundary_polygon(polygon))
    }

    /// Use `polygon` as the boundary and turn auto-fit off. A polygon with
    /// fewer than three vertices suppresses rendering.
    pub fn set_boundary_polygon(&mut self, polygon: Polygon) -> Option<RenderEvent> {
        self.boundary = Some(polygon);
        self.auto_fit = false;
        self.changed()
    }

    /// Follow the data's bounding box (plus margin) instead of a fixed shape.
    pub fn set_auto_fit(&mut self, enabled: bool) -> Option<RenderEvent> {
        self.auto_fit = enabled;
        self.changed()
    }

    pub fn auto_fit(&self) -> bool {
        self.auto_fit
    }

    /// The boundary the next render would use.
    pub fn effective_boundary(&self) -> Option<Polygon> {
        if self.auto_fit {
            let (points, _) = self.working_data();
            self.fit_boundary(&points)
        } else {
            self.boundary.clone()
        }
    }

    fn fit_boundary(&self, points: &[Point2]) -> Option<Polygon> {
        let bbox = BoundingBox::from_points(points)?;
        let margin = self.config.auto_fit_margin;
        let fallback = bbox.width().max(bbox.height()).max(1.0) * margin.max(0.05);
        let pad = |extent: f64| if extent > 0.0 { extent * margin } else { fallback };
        Some(Polygon::from(bbox.expanded(pad(bbox.width()), pad(bbox.height()))))
    }

    // ========================================================================
    // Appearance and interpolation settings
    // ========================================================================

    /// Fix the color range; `min` must be strictly below `max`.
    pub fn set_color_range(&mut self, min: f64, max: f64) -> FieldResult<Option<RenderEvent>> {
        let range = ColorRange::new(min, max)?;
        self.config.color_range = Some(range);
        Ok(self.changed())
    }

    pub fn set_auto_color_range(&mut self) -> Option<RenderEvent> {
        self.config.color_range = None;
        self.changed()
    }

    /// Range the next render normalizes against, `None` without data.
    pub fn color_range(&self) -> Option<(f64, f64)> {
        match self.config.color_range {
            Some(range) => Some((range.min(), range.max())),
            None => ColorRange::of_values(&self.working_data().1),
        }
    }

    pub fn set_colormap(&mut self, name: &str) -> FieldResult<Option<RenderEvent>> {
        let colormap: Colormap = name.parse()?;
        self.config.colormap = colormap;
        self.lut = colormap.lut();
        Ok(self.changed())
    }

    pub fn lut(&self) -> &ColorLut {
        &self.lut
    }

    /// `None` selects the global solve.
    pub fn set_neighbors(&mut self, neighbors: Option<usize>) -> FieldResult<Option<RenderEvent>> {
        if neighbors == Some(0) {
            return Err(FieldError::invalid_parameter("neighbors", "must be >= 1"));
        }
        self.config.neighbors = neighbors;
        self.cache.set_settings(self.config.rbf_settings());
        Ok(self.changed())
    }

    pub fn set_kernel(&mut self, kernel: Kernel) -> Option<RenderEvent> {
        self.config.kernel = kernel;
        self.cache.set_settings(self.config.rbf_settings());
        self.changed()
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> FieldResult<Option<RenderEvent>> {
        if !(epsilon > 0.0) || !epsilon.is_finite() {
            return Err(FieldError::invalid_parameter("epsilon", "must be a positive number"));
        }
        self.config.epsilon = epsilon;
        self.cache.set_settings(self.config.rbf_settings());
        Ok(self.changed())
    }

    /// Apply a quality preset and re-render.
    pub fn set_quality(&mut self, quality: Quality) -> Option<RenderEvent> {
        self.config.quality = quality;
        self.controller.set_target_ms(Some(self.config.target_ms()));
        self.changed()
    }

    /// Set an explicit target and switch to [`Quality::Adaptive`].
    pub fn set_target_render_time(&mut self, ms: f64) -> FieldResult<Option<RenderEvent>> {
        if !(ms > 0.0) {
            return Err(FieldError::invalid_parameter("target_render_time_ms", "must be > 0"));
        }
        self.config.target_render_time_ms = Some(ms);
        Ok(self.set_quality(Quality::Adaptive))
    }

    pub fn controller(&self) -> &AdaptiveQualityController {
        &self.controller
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn image(&self) -> Option<&HeatmapImage> {
        self.image.as_ref()
    }

    /// Render the fast pass and request a refinement.
    fn changed(&mut self) -> Option<RenderEvent> {
        self.refinement_requested = true;
        self.render(RenderPass::Fast)
    }

    /// True once per change burst; the host should (re)start its debounce timer.
    pub fn take_refinement_request(&mut self) -> bool {
        std::mem::take(&mut self.refinement_requested)
    }

    /// Render at the full adaptive resolution.
    pub fn refine(&mut self) -> Option<RenderEvent> {
        self.render(RenderPass::Refined)
    }

    /// Run one render pass.
    ///
    /// Too few working points or an unusable boundary clear the frame. A
    /// failed interpolator fit keeps the previous frame.
    pub fn render(&mut self, pass: RenderPass) -> Option<RenderEvent> {
        let started = Instant::now();
        let (points, values) = self.working_data();

        if points.len() < MIN_RENDER_POINTS {
            debug!(points = points.len(), "Too few points to render");
            self.image = None;
            return None;
        }

        let boundary = if self.auto_fit {
            self.fit_boundary(&points)
        } else {
            self.boundary.clone()
        };
        let boundary = match boundary {
            Some(b) if !b.is_degenerate() => b,
            _ => {
                debug!("No usable boundary, nothing to render");
                self.image = None;
                return None;
            }
        };

        let grid_size = match pass {
            RenderPass::Fast => self.controller.fast_grid_size(),
            RenderPass::Refined => self.controller.full_grid_size(),
        };

        let fitted = self.cache.get_interpolator(grid_size, &points, &boundary);
        let Some(grid) = fitted.evaluate(&values) else {
            warn!(
                points = points.len(),
                grid_size,
                %pass,
                "Interpolator unavailable, frame skipped"
            );
            return None;
        };

        let (min, max) = match self.config.color_range {
            Some(range) => (range.min(), range.max()),
            None => ColorRange::of_values(&values).unwrap_or((0.0, 1.0)),
        };
        let spec = fitted.grid();
        self.image = Some(HeatmapImage {
            width: spec.cols,
            height: spec.rows,
            pixels: colorize(&grid, &self.lut, min, max),
            bounds: spec.bounds,
            grid_size,
            pass,
        });

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let adaptive = self.controller.record(duration_ms, grid_size);
        debug!(
            %pass,
            grid_size,
            points = points.len(),
            duration_ms,
            adaptive,
            "Rendered heatmap"
        );

        Some(RenderEvent {
            duration_ms,
            grid_size,
            pass,
        })
    }
}

impl std::fmt::Debug for HeatmapRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeatmapRenderer")
            .field("points", &self.data.len())
            .field("excluded", &self.excluded.len())
            .field("auto_fit", &self.auto_fit)
            .field("adaptive_size", &self.controller.adaptive_size())
            .field("has_image", &self.image.is_some())
            .finish()
    }
}
