use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::config::ProjectConfig;
use crate::motion::recorder::RecordedMotion;
use crate::motion::timeseries::TimeSeries;
use crate::motion::{Error, Result};
use crate::utils::{ensure_dir_exists, path_has_ext, path_must_str, read_file};
use crate::Context;

/// Path-managed access to the golden tree.
///
/// Goldens live under one root, keyed by test class and method:
/// `<root>/<class>/<method>[.<identifier>].json`, with any screenshots in a
/// sibling directory of the same name.
pub struct GoldenStore {
    root: PathBuf,
    output: PathBuf,
}

impl GoldenStore {
    pub fn new(ctx: &dyn Context) -> crate::Result<Self> {
        let root = match ctx.get_project_config()? {
            Some(cfg) => match ProjectConfig::from_config(cfg)?.goldens.dir {
                Some(dir) if dir.is_absolute() => dir,
                Some(dir) => ctx.get_project_dir()?.join(dir),
                None => ctx.get_goldens_dir()?,
            },
            None => ctx.get_goldens_dir()?,
        };
        let output = ctx.get_output_dir_child("motion")?;
        Ok(Self { root, output })
    }

    pub fn from_root<P: AsRef<Path>>(root: P, output: P) -> Self {
        Self {
            root: root.as_ref().into(),
            output: output.as_ref().into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(method: &str, identifier: Option<&str>) -> String {
        match identifier {
            Some(id) => format!("{}.{}.json", method, id),
            None => format!("{}.json", method),
        }
    }

    pub fn golden_path(&self, class: &str, method: &str, identifier: Option<&str>) -> PathBuf {
        self.root.join(class).join(Self::file_name(method, identifier))
    }

    pub fn exists(&self, class: &str, method: &str, identifier: Option<&str>) -> bool {
        self.golden_path(class, method, identifier).exists()
    }

    pub fn read(&self, class: &str, method: &str, identifier: Option<&str>) -> Result<TimeSeries> {
        let path = self.golden_path(class, method, identifier);
        if !path.exists() {
            return Err(Error::MissingGolden(path_must_str(&path).into()));
        }
        Self::read_document(&path)
    }

    /// Read a golden document straight from a path
    pub fn read_document(path: &Path) -> Result<TimeSeries> {
        let raw = read_file(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| Error::InvalidGolden {
                path: path_must_str(path).into(),
                reason: e.to_string(),
            })?;
        TimeSeries::from_json(&value).map_err(|e| Error::InvalidGolden {
            path: path_must_str(path).into(),
            reason: e.to_string(),
        })
    }

    /// Write the recorded time series (and screenshots, when captured) as the
    /// new golden
    pub fn write(&self, recorded: &RecordedMotion, identifier: Option<&str>) -> Result<()> {
        let path = self.golden_path(&recorded.test_class, &recorded.test_method, identifier);
        write_document(&path, &recorded.time_series)?;
        info!("golden updated: {}", path_must_str(&path));

        if let Some(screenshots) = &recorded.screenshots {
            let dir = path.with_extension("");
            ensure_dir_exists(&dir)?;
            for (i, shot) in screenshots.iter().enumerate() {
                let file = dir.join(format!("frame_{:03}.png", i));
                fs::write(&file, &shot.png)?;
                debug!(
                    "screenshot {} sha256 {}",
                    path_must_str(&file),
                    shot.digest()
                );
            }
        }
        Ok(())
    }

    /// Dump the actual values of a failed comparison under the output dir so
    /// they can be inspected (or promoted to a new golden)
    pub fn export_actual(
        &self,
        recorded: &RecordedMotion,
        identifier: Option<&str>,
    ) -> Result<PathBuf> {
        let name = match identifier {
            Some(id) => format!("{}.{}.actual.json", recorded.test_method, id),
            None => format!("{}.actual.json", recorded.test_method),
        };
        let path = self.output.join(&recorded.test_class).join(name);
        write_document(&path, &recorded.time_series)?;
        info!("actual time series exported to {}", path_must_str(&path));
        Ok(path)
    }

    /// Every golden document under the root, sorted by path
    pub fn list(&self) -> Vec<PathBuf> {
        let mut goldens: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && path_has_ext(e.path(), "json"))
            .map(|e| e.into_path())
            .collect();
        goldens.sort();
        goldens
    }
}

fn write_document(path: &Path, series: &TimeSeries) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    let doc = series.to_json();
    let pretty = serde_json::to_string_pretty(&doc)
        .expect("serde_json::Value always serializes");
    fs::write(path, pretty + "\n")?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::motion::datapoint::{DataPoint, FeatureValue};
    use crate::motion::recorder::Screenshot;
    use crate::motion::timeseries::{Feature, FrameId};
    use crate::testing::TestContext;

    fn sample_series() -> TimeSeries {
        TimeSeries::new(
            vec![FrameId::Timestamp(0), FrameId::Timestamp(16)],
            vec![Feature::new(
                "alpha",
                vec![
                    DataPoint::Value(FeatureValue::Float(0.0)),
                    DataPoint::Value(FeatureValue::Float(1.0)),
                ],
            )],
        )
        .expect("aligned")
    }

    fn sample_motion() -> RecordedMotion {
        RecordedMotion {
            test_class: "FadeTest".into(),
            test_method: "fades_in".into(),
            time_series: sample_series(),
            screenshots: None,
        }
    }

    #[test]
    fn test_write_read_round_trip() {
        let ctx = TestContext::default();
        let store = GoldenStore::new(&ctx).expect("store");
        let motion = sample_motion();

        store.write(&motion, None).expect("write");
        assert!(store.exists("FadeTest", "fades_in", None));

        let read = store.read("FadeTest", "fades_in", None).expect("read");
        assert_eq!(read, motion.time_series);
    }

    #[test]
    fn test_read_missing_golden() {
        let ctx = TestContext::default();
        let store = GoldenStore::new(&ctx).expect("store");
        let err = store.read("FadeTest", "nope", None).expect_err("missing");
        assert!(matches!(err, Error::MissingGolden(_)));
    }

    #[test]
    fn test_invalid_golden() {
        let ctx = TestContext::default();
        let store = GoldenStore::new(&ctx).expect("store");
        let path = store.golden_path("FadeTest", "broken", None);
        ensure_dir_exists(path.parent().unwrap()).expect("dirs");
        fs::write(&path, "not json").expect("write");

        let err = store.read("FadeTest", "broken", None).expect_err("invalid");
        assert!(matches!(err, Error::InvalidGolden { .. }));
    }

    #[test]
    fn test_list_goldens() {
        let ctx = TestContext::default();
        let store = GoldenStore::new(&ctx).expect("store");
        store.write(&sample_motion(), None).expect("write");
        store.write(&sample_motion(), Some("dark")).expect("write");

        let goldens = store.list();
        assert_eq!(goldens.len(), 2);
        assert!(goldens.iter().all(|p| path_has_ext(p, "json")));
    }

    #[test]
    fn test_screenshots_written_next_to_golden() {
        let ctx = TestContext::default();
        let store = GoldenStore::new(&ctx).expect("store");
        let mut motion = sample_motion();
        motion.screenshots = Some(vec![
            Screenshot::new(vec![1, 2, 3]),
            Screenshot::new(vec![4, 5, 6]),
        ]);

        store.write(&motion, None).expect("write");
        let dir = store.golden_path("FadeTest", "fades_in", None).with_extension("");
        assert!(dir.join("frame_000.png").exists());
        assert!(dir.join("frame_001.png").exists());
    }

    #[test]
    fn test_export_actual() {
        let ctx = TestContext::default();
        let store = GoldenStore::new(&ctx).expect("store");
        let path = store.export_actual(&sample_motion(), None).expect("export");
        assert!(path.exists());
        let read = GoldenStore::read_document(&path).expect("readable");
        assert_eq!(read, sample_series());
    }
}
