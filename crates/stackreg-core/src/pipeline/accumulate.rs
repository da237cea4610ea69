use crate::frame::{FrameOffset, FrameOffsets};

/// Turn frame-to-frame offsets into offsets relative to the first frame:
/// `out[i] = sum(relative[0..=i])`.
pub fn accumulate_offsets(relative: &FrameOffsets) -> FrameOffsets {
    let mut out = FrameOffsets::zeros(relative.len());
    let mut running = FrameOffset::default();
    for (i, step) in relative.iter().enumerate() {
        running = running + step;
        out.set(i, running);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_sum() {
        let mut rel = FrameOffsets::zeros(4);
        rel.set(1, FrameOffset::new(1.0, 0.5));
        rel.set(2, FrameOffset::new(1.0, 0.5));
        rel.set(3, FrameOffset::new(-3.0, 0.0));
        let abs = accumulate_offsets(&rel);
        assert_eq!(abs.get(0), FrameOffset::new(0.0, 0.0));
        assert_eq!(abs.get(2), FrameOffset::new(2.0, 1.0));
        assert_eq!(abs.get(3), FrameOffset::new(-1.0, 1.0));
    }
}
