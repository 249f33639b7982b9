use crate::domain::model::SkyMap;

/// Rescales every sample by a constant factor, K to μK by default.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    multiplier: f64,
    unit_symbol: Option<String>,
}

impl UnitConverter {
    pub fn new(multiplier: f64) -> Self {
        Self {
            multiplier,
            unit_symbol: None,
        }
    }

    /// Unit recorded on the converted map.
    pub fn with_unit_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.unit_symbol = Some(symbol.into());
        self
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn unit_symbol(&self) -> Option<&str> {
        self.unit_symbol.as_deref()
    }

    pub fn convert(&self, mut map: SkyMap) -> SkyMap {
        tracing::debug!(
            "Scaling {} samples by {} ({} -> {})",
            map.npix(),
            self.multiplier,
            map.unit.as_deref().unwrap_or("?"),
            self.unit_symbol.as_deref().unwrap_or("?")
        );
        map.scale_in_place(self.multiplier);
        if let Some(symbol) = &self.unit_symbol {
            map.unit = Some(symbol.clone());
        }
        map
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(1e6).with_unit_symbol("μK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healpix::Ordering;
    use approx::assert_relative_eq;

    #[test]
    fn test_kelvin_to_microkelvin() {
        let map = SkyMap::new(vec![-2.5e-4, 0.0, 1e-6, 3e-4].repeat(3), Ordering::Ring)
            .unwrap()
            .with_unit("K_CMB");
        let converted = UnitConverter::default().convert(map);

        assert_relative_eq!(converted.samples()[0], -250.0, epsilon = 1e-9);
        assert_relative_eq!(converted.samples()[2], 1.0, epsilon = 1e-9);
        assert_relative_eq!(converted.samples()[3], 300.0, epsilon = 1e-9);
        assert_eq!(converted.unit.as_deref(), Some("μK"));
        assert_eq!(converted.nside(), 1);
    }

    #[test]
    fn test_unit_left_alone_without_symbol() {
        let map = SkyMap::new(vec![2.0; 12], Ordering::Nested).unwrap().with_unit("K");
        let converted = UnitConverter::new(0.5).convert(map);
        assert_eq!(converted.unit.as_deref(), Some("K"));
        assert!(converted.samples().iter().all(|&v| v == 1.0));
    }
}
