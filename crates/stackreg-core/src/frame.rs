use std::fmt::Write as _;

use ndarray::{Array2, ArrayView2};

/// A 2D image whose pixels may be missing.
pub type MaskedImage = Array2<Option<f64>>;

/// Add two samples, ignoring missing ones. The result is missing only when
/// both inputs are.
#[inline]
pub fn masked_add(acc: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (acc, value) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, v) => v,
    }
}

/// Replace missing samples with zero so the image can enter the FFT.
pub fn fill_missing(image: &MaskedImage) -> Array2<f64> {
    image.mapv(|v| v.unwrap_or(0.0))
}

/// Translation of one frame relative to the reference, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameOffset {
    /// Vertical (row axis) shift.
    pub row: f64,
    /// Horizontal (column axis) shift.
    pub col: f64,
}

impl FrameOffset {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }
}

impl std::ops::Add for FrameOffset {
    type Output = FrameOffset;

    fn add(self, rhs: FrameOffset) -> FrameOffset {
        FrameOffset::new(self.row + rhs.row, self.col + rhs.col)
    }
}

/// Result of registering one spectrum against another.
#[derive(Clone, Copy, Debug, Default)]
pub struct Registration {
    pub offset: FrameOffset,
    /// Normalized cross-correlation magnitude at the peak, in [0, 1].
    pub strength: f64,
}

/// Per-frame offsets, an `F x 2` matrix: column 0 is the vertical shift,
/// column 1 the horizontal shift.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOffsets {
    data: Array2<f64>,
}

impl FrameOffsets {
    /// All-zero offsets for `frames` frames.
    pub fn zeros(frames: usize) -> Self {
        Self {
            data: Array2::zeros((frames, 2)),
        }
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn get(&self, frame: usize) -> FrameOffset {
        FrameOffset::new(self.data[[frame, 0]], self.data[[frame, 1]])
    }

    pub fn set(&mut self, frame: usize, offset: FrameOffset) {
        self.data[[frame, 0]] = offset.row;
        self.data[[frame, 1]] = offset.col;
    }

    pub fn set_row(&mut self, frame: usize, row: f64) {
        self.data[[frame, 0]] = row;
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameOffset> + '_ {
        self.data
            .rows()
            .into_iter()
            .map(|r| FrameOffset::new(r[0], r[1]))
    }

    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    /// Render as CSV with a `frame,row,col` header.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("frame,row,col\n");
        for (i, o) in self.iter().enumerate() {
            let _ = writeln!(out, "{},{},{}", i, o.row, o.col);
        }
        out
    }
}
