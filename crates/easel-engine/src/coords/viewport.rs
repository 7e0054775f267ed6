/// Viewport rectangle in physical canvas pixels.
///
/// Mirrors the arguments of a classic `viewport(x, y, w, h)` call.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Full-canvas viewport.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Clamps the viewport to a canvas of the given size.
    ///
    /// Returns `None` when nothing of the viewport remains on the canvas.
    pub fn clamped_to(self, width: u32, height: u32) -> Option<Viewport> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        let v = Viewport::new(self.x, self.y, w, h);
        v.is_valid().then_some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_viewport_is_unchanged_by_clamp() {
        let v = Viewport::full(800, 600);
        assert_eq!(v.clamped_to(800, 600), Some(v));
    }

    #[test]
    fn oversized_viewport_is_clamped() {
        let v = Viewport::new(700, 500, 400, 400);
        assert_eq!(v.clamped_to(800, 600), Some(Viewport::new(700, 500, 100, 100)));
    }

    #[test]
    fn offscreen_viewport_is_dropped() {
        assert!(Viewport::new(800, 0, 10, 10).clamped_to(800, 600).is_none());
        assert!(Viewport::new(0, 0, 0, 10).clamped_to(800, 600).is_none());
    }
}
