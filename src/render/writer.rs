use crate::domain::ports::Storage;
use crate::render::figure::RenderedFigure;
use crate::utils::error::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};

const METERS_PER_INCH: f64 = 0.0254;

/// PNG pixels-per-metre for a DPI value.
pub fn dpi_to_ppm(dpi: u32) -> u32 {
    (dpi as f64 / METERS_PER_INCH).round() as u32
}

/// Encode the figure as an 8-bit RGB PNG with its DPI and title.
pub fn encode_png(figure: &RenderedFigure) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, figure.width(), figure.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let ppm = dpi_to_ppm(figure.dpi());
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        encoder.add_itxt_chunk("Title".to_string(), figure.title().to_string())?;
        encoder.add_text_chunk(
            "Software".to_string(),
            format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        )?;
        encoder.add_text_chunk("Creation Time".to_string(), Utc::now().to_rfc2822())?;

        let mut writer = encoder.write_header()?;
        writer.write_image_data(figure.pixels())?;
        writer.finish()?;
    }
    Ok(bytes)
}

pub struct ImageWriter<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> ImageWriter<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Encode and store the figure. Takes the figure by value, so it is
    /// released when this returns, whether or not the write worked.
    pub fn write(&self, figure: RenderedFigure, path: &Path) -> Result<PathBuf> {
        let bytes = encode_png(&figure)?;
        tracing::debug!(
            "Encoded {}x{} PNG at {} dpi ({} bytes)",
            figure.width(),
            figure.height(),
            figure.dpi(),
            bytes.len()
        );
        drop(figure);

        self.storage.write_file(path, &bytes)?;
        tracing::info!("💾 Image saved to {}", path.display());
        Ok(path.to_path_buf())
    }
}
