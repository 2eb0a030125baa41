//! Fixed window rolling mean filter
//!
//! The accumulator holds the most recent `window_size` samples of a scalar
//! stream in a preallocated ring buffer, so that accumulating a sample never
//! allocates.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rolling mean over the last `window_size` samples.
#[derive(Debug, Clone)]
pub struct RollingMeanAccumulator<T> {
    buffer: Vec<T>,

    /// Index the next sample will be written to.
    next_idx: usize,

    /// Number of valid samples in the buffer, at most `buffer.len()`.
    num_samples: usize,

    sum: T,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum RollingMeanError {
    #[error("The rolling window size must be at least 1")]
    ZeroWindowSize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> RollingMeanAccumulator<T>
where
    T: Float,
{
    /// Create a new empty accumulator with the given window size.
    pub fn new(window_size: usize) -> Result<Self, RollingMeanError> {
        if window_size == 0 {
            return Err(RollingMeanError::ZeroWindowSize);
        }

        Ok(Self {
            buffer: vec![T::zero(); window_size],
            next_idx: 0,
            num_samples: 0,
            sum: T::zero(),
        })
    }

    /// Add a sample, evicting the oldest one if the window is full.
    pub fn accumulate(&mut self, value: T) {
        if self.num_samples == self.buffer.len() {
            self.sum = self.sum - self.buffer[self.next_idx];
        } else {
            self.num_samples += 1;
        }

        self.buffer[self.next_idx] = value;
        self.sum = self.sum + value;
        self.next_idx = (self.next_idx + 1) % self.buffer.len();
    }

    /// Get the mean of the samples currently held, or `None` if there are no
    /// samples yet.
    pub fn get_rolling_mean(&self) -> Option<T> {
        if self.num_samples == 0 {
            return None;
        }

        T::from(self.num_samples).map(|n| self.sum / n)
    }

    /// Discard all samples, keeping the window size.
    pub fn reset(&mut self) {
        for v in self.buffer.iter_mut() {
            *v = T::zero();
        }
        self.next_idx = 0;
        self.num_samples = 0;
        self.sum = T::zero();
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.num_samples
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    pub fn window_size(&self) -> usize {
        self.buffer.len()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
