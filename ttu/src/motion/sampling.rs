use super::{Error, Result};

/// Where a recording stops an animation to capture features.
///
/// The interior positions are progress fractions in `[0, 1]`; the optional
/// `before`/`after` flags add supplemental frames captured outside the
/// animation itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSampling {
    frame_positions: Vec<f32>,
    sample_before: bool,
    sample_after: bool,
}

impl AnimationSampling {
    pub fn from_positions(positions: Vec<f32>) -> Result<Self> {
        if positions.is_empty() {
            return Err(Error::InvalidSampling("no sample positions".into()));
        }
        for pair in positions.windows(2) {
            if pair[0] >= pair[1] {
                return Err(Error::InvalidSampling(format!(
                    "positions must strictly increase, got {} before {}",
                    pair[0], pair[1]
                )));
            }
        }
        if let (Some(first), Some(last)) = (positions.first(), positions.last()) {
            if *first < 0.0 || *last > 1.0 {
                return Err(Error::InvalidSampling(format!(
                    "positions must stay in [0, 1], got [{}, {}]",
                    first, last
                )));
            }
        }
        Ok(Self {
            frame_positions: positions,
            sample_before: false,
            sample_after: false,
        })
    }

    /// `count` stops spread evenly over the animation. `sample_at_start` and
    /// `sample_at_end` control whether progress 0 and 1 themselves are among
    /// the stops.
    pub fn evenly_sampled(count: usize, sample_at_start: bool, sample_at_end: bool) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidSampling("count must be positive".into()));
        }
        if count == 1 && sample_at_start && sample_at_end {
            return Err(Error::InvalidSampling(
                "one sample can't cover both start and end".into(),
            ));
        }

        let positions = (0..count)
            .map(|i| match (sample_at_start, sample_at_end) {
                (true, true) => i as f32 / (count - 1) as f32,
                (true, false) => i as f32 / count as f32,
                (false, true) => (i + 1) as f32 / count as f32,
                (false, false) => (i + 1) as f32 / (count + 1) as f32,
            })
            .collect();

        Self::from_positions(positions)
    }

    /// Also capture one frame before the animation starts
    pub fn with_before_sample(mut self) -> Self {
        self.sample_before = true;
        self
    }

    /// Also capture one frame after the animation has settled
    pub fn with_after_sample(mut self) -> Self {
        self.sample_after = true;
        self
    }

    pub fn frame_positions(&self) -> &[f32] {
        &self.frame_positions
    }

    pub fn sample_before(&self) -> bool {
        self.sample_before
    }

    pub fn sample_after(&self) -> bool {
        self.sample_after
    }
}
