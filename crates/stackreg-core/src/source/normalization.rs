use std::ops::{Deref, DerefMut};

use tracing::debug;

use super::{ImageStack, NormalizationMode};

/// Scoped override of a stack's normalization mode.
///
/// The previous mode is restored when the guard is dropped, including when
/// the holder returns early with an error.
pub struct NormalizationOverride<'a, S: ImageStack + ?Sized> {
    stack: &'a mut S,
    previous: NormalizationMode,
}

impl<'a, S: ImageStack + ?Sized> NormalizationOverride<'a, S> {
    pub fn new(stack: &'a mut S, mode: NormalizationMode) -> Self {
        let previous = stack.normalization();
        if previous != mode {
            debug!(from = %previous, to = %mode, "Overriding stack normalization");
            stack.set_normalization(mode);
        }
        Self { stack, previous }
    }

    pub fn previous(&self) -> NormalizationMode {
        self.previous
    }
}

impl<S: ImageStack + ?Sized> Deref for NormalizationOverride<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stack
    }
}

impl<S: ImageStack + ?Sized> DerefMut for NormalizationOverride<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stack
    }
}

impl<S: ImageStack + ?Sized> Drop for NormalizationOverride<'_, S> {
    fn drop(&mut self) {
        if self.stack.normalization() != self.previous {
            self.stack.set_normalization(self.previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::source::ArrayStack;

    #[test]
    fn guard_remembers_and_restores_previous_mode() {
        let mut stack = ArrayStack::from_frames(&[Array2::from_elem((2, 2), 4.0f32)])
            .unwrap()
            .with_normalization(NormalizationMode::ChannelMax);
        {
            let guard = NormalizationOverride::new(&mut stack, NormalizationMode::None);
            assert_eq!(guard.previous(), NormalizationMode::ChannelMax);
            assert_eq!(guard.normalization(), NormalizationMode::None);
            assert_eq!(guard.read(&[0], &[0]).unwrap()[[0, 0, 0, 0]], Some(4.0));
        }
        assert_eq!(stack.normalization(), NormalizationMode::ChannelMax);
    }
}
