/// Straight-alpha RGBA color with `f32` components in `[0, 1]`.
///
/// Used for clear colors. Pixel data uploaded as textures stays in RGBA8 and is
/// never premultiplied.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Converts `0..=255` channel bytes to normalized floats.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_extremes_map_to_unit_range() {
        assert_eq!(ColorRgba::from_rgba8(0, 0, 0, 255), ColorRgba::black());
        assert_eq!(
            ColorRgba::from_rgba8(255, 255, 255, 0),
            ColorRgba::new(1.0, 1.0, 1.0, 0.0)
        );
    }

    #[test]
    fn rgba8_midpoint() {
        let c = ColorRgba::from_rgba8(51, 102, 204, 255);
        assert!((c.r - 0.2).abs() < 1e-6);
        assert!((c.g - 0.4).abs() < 1e-6);
        assert!((c.b - 0.8).abs() < 1e-6);
    }
}
