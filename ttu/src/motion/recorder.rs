use log::debug;
use sha2::{Digest, Sha256};

use super::capture::{FeatureCapture, UiSnapshot};
use super::sampling::AnimationSampling;
use super::timeseries::{Feature, FrameId, TimeSeries};
use super::Result;

pub const BEFORE_FRAME: &str = "before";
pub const AFTER_FRAME: &str = "after";

/// One captured frame image
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub png: Vec<u8>,
}

impl Screenshot {
    pub fn new(png: Vec<u8>) -> Self {
        Self { png }
    }

    /// Hex sha256 of the image bytes
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.png);
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Drives a seekable animation on its own clock.
///
/// The recorder owns the sampling schedule; implementations only need to park
/// the animation at a progress fraction and report what the UI looks like
/// there.
pub trait AnimationDriver {
    /// Advance the animation to the given progress fraction and return the
    /// animation-clock timestamp (milliseconds) of the produced frame
    fn seek_to(&mut self, progress: f32) -> Result<i64>;

    /// The UI tree at the current frame
    fn snapshot(&self) -> UiSnapshot;

    /// Let the animation finish and the UI settle, ahead of an `after` frame
    fn settle(&mut self) -> Result<()> {
        Ok(())
    }

    fn take_screenshot(&mut self) -> Option<Screenshot> {
        None
    }
}

/// The frozen output of one recording session
#[derive(Debug, Clone)]
pub struct RecordedMotion {
    pub test_class: String,
    pub test_method: String,
    pub time_series: TimeSeries,
    /// One screenshot per frame, present only when the driver captured every
    /// frame
    pub screenshots: Option<Vec<Screenshot>>,
}

/// Samples an animation and captures features at every stop
pub struct MotionRecorder {
    test_class: String,
    test_method: String,
    captures: Vec<FeatureCapture>,
}

impl MotionRecorder {
    pub fn new<C: AsRef<str>, M: AsRef<str>>(test_class: C, test_method: M) -> Self {
        Self {
            test_class: test_class.as_ref().into(),
            test_method: test_method.as_ref().into(),
            captures: Vec::new(),
        }
    }

    pub fn add_capture(mut self, capture: FeatureCapture) -> Self {
        self.captures.push(capture);
        self
    }

    /// Run the sampling schedule against the driver and freeze the result.
    ///
    /// A capture that can't resolve its target records a not-found data point
    /// for that frame; only driver failures abort the recording.
    pub fn record(
        &self,
        driver: &mut dyn AnimationDriver,
        sampling: &AnimationSampling,
    ) -> Result<RecordedMotion> {
        let mut frame_ids = Vec::new();
        let mut columns: Vec<Vec<super::datapoint::DataPoint>> =
            self.captures.iter().map(|_| Vec::new()).collect();
        let mut screenshots: Vec<Option<Screenshot>> = Vec::new();

        let sample = |driver: &mut dyn AnimationDriver,
                      frame_id: FrameId,
                      frame_ids: &mut Vec<FrameId>,
                      columns: &mut Vec<Vec<super::datapoint::DataPoint>>,
                      screenshots: &mut Vec<Option<Screenshot>>| {
            let snapshot = driver.snapshot();
            for (capture, column) in self.captures.iter().zip(columns.iter_mut()) {
                column.push(capture.capture(&snapshot));
            }
            screenshots.push(driver.take_screenshot());
            frame_ids.push(frame_id);
        };

        if sampling.sample_before() {
            sample(
                driver,
                FrameId::supplemental(BEFORE_FRAME),
                &mut frame_ids,
                &mut columns,
                &mut screenshots,
            );
        }

        for position in sampling.frame_positions() {
            let ts = driver.seek_to(*position)?;
            sample(
                driver,
                FrameId::Timestamp(ts),
                &mut frame_ids,
                &mut columns,
                &mut screenshots,
            );
        }

        if sampling.sample_after() {
            driver.settle()?;
            sample(
                driver,
                FrameId::supplemental(AFTER_FRAME),
                &mut frame_ids,
                &mut columns,
                &mut screenshots,
            );
        }

        let features = self
            .captures
            .iter()
            .zip(columns)
            .map(|(capture, column)| Feature::new(capture.name(), column))
            .collect();

        let frame_count = frame_ids.len();
        let time_series = TimeSeries::new(frame_ids, features)?;

        let screenshots = if screenshots.iter().all(|s| s.is_some()) && frame_count > 0 {
            Some(screenshots.into_iter().flatten().collect())
        } else {
            None
        };

        debug!(
            "recorded {} frames x {} features for {}#{}",
            frame_count,
            self.captures.len(),
            self.test_class,
            self.test_method
        );

        Ok(RecordedMotion {
            test_class: self.test_class.clone(),
            test_method: self.test_method.clone(),
            time_series,
            screenshots,
        })
    }
}
