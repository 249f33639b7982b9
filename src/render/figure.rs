//! Mollweide full-sky figure: map raster, graticule, colourbar and labels.
//!
//! The map itself is painted straight into an `RgbImage`; plotters then
//! draws the vector overlays onto the same buffer.

use crate::domain::model::SkyMap;
use crate::render::colormap::Colormap;
use crate::render::projection;
use crate::utils::error::{Result, SkyMapError};
use image::{Rgb, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// Figure size in inches; the pixel size follows from the DPI.
pub const FIGURE_WIDTH_IN: f64 = 8.5;
pub const FIGURE_HEIGHT_IN: f64 = 5.4;

const TITLE_PT: f64 = 14.0;
const LABEL_PT: f64 = 10.0;
const WHITE_PIXEL: Rgb<u8> = Rgb([255, 255, 255]);

static LIVE_FIGURES: AtomicUsize = AtomicUsize::new(0);

/// Figures currently alive in this process.
pub fn live_figures() -> usize {
    LIVE_FIGURES.load(AtomicOrdering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordFrame {
    Galactic,
    Equatorial,
    Ecliptic,
}

impl CoordFrame {
    pub fn label(&self) -> &'static str {
        match self {
            CoordFrame::Galactic => "Galactic",
            CoordFrame::Equatorial => "Equatorial",
            CoordFrame::Ecliptic => "Ecliptic",
        }
    }

    /// Matches a `COORDSYS` header value or a healpy-style code.
    pub fn matches_header(&self, coordsys: &str) -> bool {
        coordsys.parse::<CoordFrame>().map(|f| f == *self).unwrap_or(false)
    }
}

impl FromStr for CoordFrame {
    type Err = SkyMapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "G" | "GALACTIC" => Ok(CoordFrame::Galactic),
            "C" | "Q" | "CELESTIAL" | "EQUATORIAL" => Ok(CoordFrame::Equatorial),
            "E" | "ECLIPTIC" => Ok(CoordFrame::Ecliptic),
            other => Err(SkyMapError::InvalidConfigValueError {
                field: "render.coord".to_string(),
                value: other.to_string(),
                reason: "Expected G, C or E".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub unit_label: String,
    pub colormap: Colormap,
    pub min: f64,
    pub max: f64,
    pub coord_frame: CoordFrame,
    pub colorbar: bool,
    /// Graticule spacing in degrees, `None` to omit it.
    pub graticule: Option<f64>,
    pub dpi: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Planck CMB Temperature Anisotropies (SMICA 2018)".to_string(),
            unit_label: "ΔT [μK]".to_string(),
            colormap: Colormap::Turbo,
            min: -300.0,
            max: 300.0,
            coord_frame: CoordFrame::Galactic,
            colorbar: true,
            graticule: Some(30.0),
            dpi: 300,
        }
    }
}

/// Raster produced by the renderer, consumed once by the image writer.
///
/// Dropping it releases the pixel buffer.
pub struct RenderedFigure {
    image: RgbImage,
    dpi: u32,
    title: String,
}

impl RenderedFigure {
    pub fn from_image(image: RgbImage, dpi: u32, title: impl Into<String>) -> Self {
        LIVE_FIGURES.fetch_add(1, AtomicOrdering::SeqCst);
        Self {
            image,
            dpi,
            title: title.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

impl Drop for RenderedFigure {
    fn drop(&mut self) {
        LIVE_FIGURES.fetch_sub(1, AtomicOrdering::SeqCst);
        tracing::debug!(
            "🧹 Released {}x{} figure '{}'",
            self.image.width(),
            self.image.height(),
            self.title
        );
    }
}

/// Pixel geometry of the figure at a given DPI.
#[derive(Debug, Clone, Copy)]
struct FigureLayout {
    width: u32,
    height: u32,
    center_x: f64,
    center_y: f64,
    half_width: f64,
    half_height: f64,
    title_y: i32,
    colorbar: (i32, i32, i32, i32),
    title_px: f64,
    label_px: f64,
}

impl FigureLayout {
    fn new(dpi: u32, with_colorbar: bool) -> Self {
        let dpi = dpi as f64;
        let width = (FIGURE_WIDTH_IN * dpi).round().max(16.0);
        let height = (FIGURE_HEIGHT_IN * dpi).round().max(10.0);

        let title_band = 0.10 * height;
        let bottom_band = if with_colorbar { 0.20 * height } else { 0.04 * height };
        let available = height - title_band - bottom_band;
        let half_height = (available / 2.0).min(0.96 * width / 4.0);
        let half_width = 2.0 * half_height;
        let center_x = width / 2.0;
        let center_y = title_band + available / 2.0;

        let bar_half = 0.65 * half_width;
        let bar_top = center_y + half_height + 0.04 * height;
        let bar_height = (0.03 * height).max(2.0);

        Self {
            width: width as u32,
            height: height as u32,
            center_x,
            center_y,
            half_width,
            half_height,
            title_y: (title_band / 2.0) as i32,
            colorbar: (
                (center_x - bar_half) as i32,
                bar_top as i32,
                (center_x + bar_half) as i32,
                (bar_top + bar_height) as i32,
            ),
            title_px: TITLE_PT * dpi / 72.0,
            label_px: LABEL_PT * dpi / 72.0,
        }
    }

    fn to_pixel(&self, u: f64, v: f64) -> (i32, i32) {
        (
            (self.center_x + u * self.half_width).round() as i32,
            (self.center_y - v * self.half_height).round() as i32,
        )
    }
}

pub struct ProjectionRenderer {
    options: RenderOptions,
}

impl ProjectionRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Pixel dimensions of figures produced with these options.
    pub fn figure_size(&self) -> (u32, u32) {
        let layout = FigureLayout::new(self.options.dpi, self.options.colorbar);
        (layout.width, layout.height)
    }

    pub fn render(&self, map: &SkyMap) -> Result<RenderedFigure> {
        if map.is_empty() {
            return Err(SkyMapError::InputError {
                message: "cannot render an empty map".to_string(),
            });
        }

        let opts = &self.options;
        let layout = FigureLayout::new(opts.dpi, opts.colorbar);
        tracing::debug!(
            "Rendering {}x{} Mollweide figure ({} colormap, {}..{})",
            layout.width,
            layout.height,
            opts.colormap.name(),
            opts.min,
            opts.max
        );

        let mut image = RgbImage::from_pixel(layout.width, layout.height, WHITE_PIXEL);
        self.paint_map(&mut image, map, &layout);
        if opts.colorbar {
            self.paint_colorbar(&mut image, &layout);
        }

        {
            let root =
                BitMapBackend::with_buffer(&mut image, (layout.width, layout.height)).into_drawing_area();

            if let Some(spacing) = opts.graticule {
                draw_graticule(&root, &layout, spacing)?;
            }
            if opts.colorbar {
                let (x0, y0, x1, y1) = layout.colorbar;
                root.draw(&Rectangle::new([(x0, y0), (x1, y1)], BLACK.stroke_width(1)))
                    .map_err(|e| SkyMapError::render(e.to_string()))?;
            }
            if let Err(e) = self.draw_annotations(&root, &layout) {
                tracing::warn!("⚠️ Text annotations skipped: {}", e);
            }

            root.present().map_err(|e| SkyMapError::render(e.to_string()))?;
        }

        Ok(RenderedFigure::from_image(image, opts.dpi, opts.title.clone()))
    }

    fn paint_map(&self, image: &mut RgbImage, map: &SkyMap, layout: &FigureLayout) {
        let opts = &self.options;
        let x0 = (layout.center_x - layout.half_width).floor().max(0.0) as u32;
        let x1 = ((layout.center_x + layout.half_width).ceil() as u32).min(layout.width);
        let y0 = (layout.center_y - layout.half_height).floor().max(0.0) as u32;
        let y1 = ((layout.center_y + layout.half_height).ceil() as u32).min(layout.height);

        for py in y0..y1 {
            let v = (layout.center_y - (py as f64 + 0.5)) / layout.half_height;
            for px in x0..x1 {
                let u = (px as f64 + 0.5 - layout.center_x) / layout.half_width;
                let Some((lon, lat)) = projection::inverse(u, v) else {
                    continue;
                };
                if let Some(value) = map.value_at(lon, lat) {
                    image.put_pixel(px, py, opts.colormap.map_value(value, opts.min, opts.max));
                }
            }
        }
    }

    fn paint_colorbar(&self, image: &mut RgbImage, layout: &FigureLayout) {
        let (x0, y0, x1, y1) = layout.colorbar;
        let span = (x1 - x0).max(1) as f64;
        for x in x0.max(0)..x1.min(layout.width as i32) {
            let color = self.options.colormap.color((x - x0) as f64 / span);
            for y in y0.max(0)..y1.min(layout.height as i32) {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    fn draw_annotations(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        layout: &FigureLayout,
    ) -> std::result::Result<(), String> {
        let opts = &self.options;
        let centered = |px: f64, v: VPos| {
            ("sans-serif", px)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, v))
        };

        root.draw(&Text::new(
            opts.title.clone(),
            (layout.center_x as i32, layout.title_y),
            centered(layout.title_px, VPos::Center),
        ))
        .map_err(|e| e.to_string())?;

        if opts.colorbar {
            let (x0, _, x1, y1) = layout.colorbar;
            let gap = (layout.label_px * 0.3) as i32;
            for (x, value) in [(x0, opts.min), (x1, opts.max)] {
                root.draw(&Text::new(
                    format_bound(value),
                    (x, y1 + gap),
                    centered(layout.label_px, VPos::Top),
                ))
                .map_err(|e| e.to_string())?;
            }
            root.draw(&Text::new(
                opts.unit_label.clone(),
                (layout.center_x as i32, y1 + gap),
                centered(layout.label_px, VPos::Top),
            ))
            .map_err(|e| e.to_string())?;
        }

        let (_, bottom) = layout.to_pixel(-1.0, -1.0);
        root.draw(&Text::new(
            opts.coord_frame.label().to_string(),
            ((layout.center_x - layout.half_width) as i32, bottom),
            ("sans-serif", layout.label_px)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Left, VPos::Bottom)),
        ))
        .map_err(|e| e.to_string())?;

        Ok(())
    }
}

fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.3}", value)
    }
}

/// Parallels and meridians every `spacing` degrees.
fn draw_graticule(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    layout: &FigureLayout,
    spacing: f64,
) -> Result<()> {
    let style = BLACK.mix(0.45).stroke_width(1);
    let steps = 360;
    let mut lines: Vec<Vec<(i32, i32)>> = Vec::new();

    let mut lat = -90.0 + spacing;
    while lat < 90.0 - 1e-9 {
        let lat_rad = lat.to_radians();
        lines.push(
            (0..=steps)
                .map(|i| {
                    let lon = (-180.0 + 360.0 * i as f64 / steps as f64).to_radians();
                    let (u, v) = projection::forward(lon, lat_rad);
                    layout.to_pixel(u, v)
                })
                .collect(),
        );
        lat += spacing;
    }

    let mut lon = -180.0_f64;
    while lon <= 180.0 + 1e-9 {
        // exact ±π so the two rim meridians land on opposite sides
        let lon_rad = if lon >= 180.0 {
            std::f64::consts::PI
        } else if lon <= -180.0 {
            -std::f64::consts::PI
        } else {
            lon.to_radians()
        };
        lines.push(
            (0..=steps / 2)
                .map(|i| {
                    let lat = (-90.0 + 180.0 * i as f64 / (steps / 2) as f64).to_radians();
                    let (u, v) = projection::forward(lon_rad, lat);
                    layout.to_pixel(u, v)
                })
                .collect(),
        );
        lon += spacing;
    }

    for line in lines {
        root.draw(&PathElement::new(line, style))
            .map_err(|e| SkyMapError::render(e.to_string()))?;
    }
    Ok(())
}
