use crate::utils::error::{Result, SkyMapError};
use image::Rgb;
use std::str::FromStr;

/// Pixels with no valid sample.
pub const BAD_COLOR: Rgb<u8> = Rgb([128, 128, 128]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Turbo,
    Viridis,
    Gray,
}

// viridis anchor colours at t = 0, 1/8, ..., 1
const VIRIDIS: [[f64; 3]; 9] = [
    [0.267004, 0.004874, 0.329415],
    [0.275191, 0.194905, 0.496005],
    [0.212395, 0.359683, 0.551710],
    [0.153364, 0.497000, 0.557724],
    [0.122312, 0.633153, 0.530398],
    [0.288921, 0.758394, 0.428426],
    [0.626579, 0.854645, 0.223353],
    [0.993248, 0.906157, 0.143936],
    [0.993248, 0.906157, 0.143936],
];

impl Colormap {
    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Turbo => "turbo",
            Colormap::Viridis => "viridis",
            Colormap::Gray => "gray",
        }
    }

    /// Colour for `t` in `[0, 1]`; values outside are clamped.
    pub fn color(&self, t: f64) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let [r, g, b] = match self {
            Colormap::Turbo => turbo(t),
            Colormap::Viridis => viridis(t),
            Colormap::Gray => [t, t, t],
        };
        Rgb([to_byte(r), to_byte(g), to_byte(b)])
    }

    /// Colour for a sample under fixed bounds. Out-of-range values take
    /// the end colours; NaN and UNSEEN (within float32 rounding) get
    /// [`BAD_COLOR`].
    pub fn map_value(&self, value: f64, min: f64, max: f64) -> Rgb<u8> {
        if !value.is_finite() || crate::healpix::is_unseen(value) {
            return BAD_COLOR;
        }
        self.color((value - min) / (max - min))
    }
}

impl FromStr for Colormap {
    type Err = SkyMapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turbo" => Ok(Colormap::Turbo),
            "viridis" => Ok(Colormap::Viridis),
            "gray" | "grey" => Ok(Colormap::Gray),
            other => Err(SkyMapError::InvalidConfigValueError {
                field: "render.colormap".to_string(),
                value: other.to_string(),
                reason: "Supported colormaps: turbo, viridis, gray".to_string(),
            }),
        }
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

// polynomial fit of Google's turbo colormap
fn turbo(x: f64) -> [f64; 3] {
    let r = 0.13572138
        + x * (4.61539260 + x * (-42.66032258 + x * (132.13108234 + x * (-152.94239396 + x * 59.28637943))));
    let g = 0.09140261
        + x * (2.19418839 + x * (4.84296658 + x * (-14.18503333 + x * (4.27729857 + x * 2.82956604))));
    let b = 0.10667330
        + x * (12.64194608 + x * (-60.58204836 + x * (110.36276771 + x * (-89.90310912 + x * 27.34824973))));
    [r, g, b]
}

fn viridis(t: f64) -> [f64; 3] {
    let pos = t * 8.0;
    let i = (pos.floor() as usize).min(7);
    let frac = pos - i as f64;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
    ]
}
