use super::Vec2;

/// Axis-aligned rectangle in canvas pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

/// Texture coordinates of a full quad, laid out like [`Rect::triangle_positions`]
/// for `Rect::new(0.0, 0.0, 1.0, 1.0)`.
pub const UNIT_QUAD_POSITIONS: [f32; 12] = [
    0.0, 0.0, //
    1.0, 0.0, //
    0.0, 1.0, //
    0.0, 1.0, //
    1.0, 0.0, //
    1.0, 1.0, //
];

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut x = self.origin.x;
        let mut y = self.origin.y;
        let mut w = self.size.x;
        let mut h = self.size.y;

        if w < 0.0 {
            x += w;
            w = -w;
        }
        if h < 0.0 {
            y += h;
            h = -h;
        }

        Rect::new(x, y, w, h)
    }

    /// Two triangles (six `x, y` pairs) covering `[x, x + w] x [y, y + h]`.
    ///
    /// Vertex order: top-left, top-right, bottom-left, then bottom-left,
    /// top-right, bottom-right.
    #[inline]
    pub fn triangle_positions(self) -> [f32; 12] {
        let (x0, y0) = (self.origin.x, self.origin.y);
        let (x1, y1) = (x0 + self.size.x, y0 + self.size.y);
        [
            x0, y0, //
            x1, y0, //
            x0, y1, //
            x0, y1, //
            x1, y0, //
            x1, y1, //
        ]
    }
}
