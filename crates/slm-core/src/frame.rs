//! Owned, size-checked pixel buffers.

use std::fmt;
use std::sync::Arc;

use slm_hal::PanelSize;

use crate::error::{Result, SlmError};

/// Immutable grid of 16-bit samples, row-major.
///
/// The sample count always equals `width * height`. Cloning shares the
/// underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    size: PanelSize,
    samples: Arc<[u16]>,
}

impl Frame {
    /// Wrap `samples` as a `width` × `height` frame.
    ///
    /// # Errors
    ///
    /// [`SlmError::SizeMismatch`] if `samples.len() != width * height`.
    pub fn new(width: u32, height: u32, samples: Vec<u16>) -> Result<Self> {
        let size = PanelSize::new(width, height);
        let expected = size.pixel_count();
        if samples.len() != expected {
            return Err(SlmError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            size,
            samples: samples.into(),
        })
    }

    /// Frame of `panel` size with every sample set to `value`.
    #[must_use]
    pub fn filled(panel: PanelSize, value: u16) -> Self {
        Self {
            size: panel,
            samples: vec![value; panel.pixel_count()].into(),
        }
    }

    /// Frame of `panel` size whose sample at column `x`, row `y` is `f(x, y)`.
    pub fn from_fn(panel: PanelSize, mut f: impl FnMut(u32, u32) -> u16) -> Self {
        let mut samples = Vec::with_capacity(panel.pixel_count());
        for y in 0..panel.height {
            for x in 0..panel.width {
                samples.push(f(x, y));
            }
        }
        Self {
            size: panel,
            samples: samples.into(),
        }
    }

    /// Columns.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Rows.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Dimensions as a panel size.
    #[must_use]
    pub fn size(&self) -> PanelSize {
        self.size
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame has zero samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Row-major samples.
    #[must_use]
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Shared handle to the samples.
    pub(crate) fn shared_samples(&self) -> Arc<[u16]> {
        Arc::clone(&self.samples)
    }

    /// Sample at column `x`, row `y`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let index = u64::from(y) * u64::from(self.size.width) + u64::from(x);
        usize::try_from(index)
            .ok()
            .and_then(|i| self.samples.get(i).copied())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.size.width)
            .field("height", &self.size.height)
            .finish_non_exhaustive()
    }
}
