pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Opaque identity of one frame (main document or nested sub-frame) in a captured snapshot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Grid position of a tile within one scale factor's tile matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileIndex {
    /// Row (y) index.
    pub row: usize,
    /// Column (x) index.
    pub col: usize,
}

impl TileIndex {
    /// Construct an index from `(row, col)`.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Half-open tile index range `[row_start, row_end) x [col_start, col_end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileRange {
    /// Inclusive first row.
    pub row_start: usize,
    /// Exclusive last row.
    pub row_end: usize,
    /// Inclusive first column.
    pub col_start: usize,
    /// Exclusive last column.
    pub col_end: usize,
}

impl TileRange {
    /// Range covering no tiles.
    pub const EMPTY: Self = Self {
        row_start: 0,
        row_end: 0,
        col_start: 0,
        col_end: 0,
    };

    /// Return `true` when the range covers no tiles.
    pub fn is_empty(self) -> bool {
        self.row_start >= self.row_end || self.col_start >= self.col_end
    }

    /// Number of tiles in the range.
    pub fn len(self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.row_end - self.row_start) * (self.col_end - self.col_start)
    }

    /// Return `true` when `idx` lies inside the range.
    pub fn contains(self, idx: TileIndex) -> bool {
        self.row_start <= idx.row
            && idx.row < self.row_end
            && self.col_start <= idx.col
            && idx.col < self.col_end
    }

    /// Iterate row-major over every index in the range.
    pub fn iter(self) -> impl Iterator<Item = TileIndex> {
        let cols = self.col_start..self.col_end;
        (self.row_start..self.row_end)
            .flat_map(move |row| cols.clone().map(move |col| TileIndex { row, col }))
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            crate::foundation::math::mul_div255_u8(u16::from(c), u16::from(a))
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Channels as an `[r, g, b, a]` array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Return `true` when the rect has finite coordinates and a positive area.
pub(crate) fn rect_has_area(rect: Rect) -> bool {
    rect.x0.is_finite()
        && rect.y0.is_finite()
        && rect.x1.is_finite()
        && rect.y1.is_finite()
        && rect.width() > 0.0
        && rect.height() > 0.0
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
