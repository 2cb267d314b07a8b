pub mod store;
pub use store::GoldenStore;

pub mod compare;
pub use compare::{compare, Comparison, ValueMismatch};

use log::warn;

use crate::assertions::AssertionFailure;

use super::recorder::RecordedMotion;
use super::{Error, Result};

/// Entry point of the golden comparison: checks a recorded motion against the
/// golden stored for its test and renders mismatches as itemized facts.
pub struct RecordedMotionSubject<'a> {
    recorded: &'a RecordedMotion,
    identifier: Option<String>,
}

impl<'a> RecordedMotionSubject<'a> {
    pub fn assert_that(recorded: &'a RecordedMotion) -> Self {
        Self {
            recorded,
            identifier: None,
        }
    }

    /// Distinguish several goldens recorded by one test method
    pub fn with_identifier<S: AsRef<str>>(mut self, identifier: S) -> Self {
        self.identifier = Some(identifier.as_ref().into());
        self
    }

    fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn matches_golden(&self, store: &GoldenStore) -> Result<()> {
        let golden = store.read(
            &self.recorded.test_class,
            &self.recorded.test_method,
            self.identifier(),
        )?;

        let comparison = compare(&golden, &self.recorded.time_series);
        if comparison.is_match() {
            return Ok(());
        }

        // leave the actual values on disk for debugging; failure to do so
        // must not mask the comparison result
        if let Err(e) = store.export_actual(self.recorded, self.identifier()) {
            warn!("failed to export actual time series: {}", e);
        }

        Err(Error::GoldenMismatch(AssertionFailure::new(
            comparison.facts(),
        )))
    }

    /// Overwrite the stored golden with the recorded values
    pub fn update_golden(&self, store: &GoldenStore) -> Result<()> {
        store.write(self.recorded, self.identifier())
    }
}
