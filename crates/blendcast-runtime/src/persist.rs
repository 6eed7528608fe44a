//! Persistence sink
//!
//! Every file-save tick copies the current record and frame out of the
//! pipeline state and, on a blocking worker, writes both artifacts under
//! one timestamp. The text write and the image write fail
//! independently.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbImage;
use tokio::task::JoinSet;

use blendcast_core::{BlendcastError, BlendcastResult, RawFrame, SampleTime};
use blendcast_store::{ArtifactNames, BlobStore};
use blendcast_wire::Record;

use crate::{ImageTarget, PipelineState, StatsCounters};

/// Downscale parameters mapping a source frame onto the target size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    /// Uniform factor that matches the target height
    pub scale: f64,
    /// Extra horizontal factor that then matches the target width
    pub aspect: f64,
}

impl ScaleTransform {
    pub fn fit(source_width: u32, source_height: u32, target: &ImageTarget) -> BlendcastResult<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(BlendcastError::EmptyFrame);
        }
        let scale = target.height as f64 / source_height as f64;
        let aspect = target.width as f64 / (source_width as f64 * scale);
        Ok(Self { scale, aspect })
    }

    /// Output size for a source of the given size
    pub fn output_size(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        let width = (source_width as f64 * self.scale * self.aspect).round().max(1.0) as u32;
        let height = (source_height as f64 * self.scale).round().max(1.0) as u32;
        (width, height)
    }

    /// Lanczos resample of `image`
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = self.output_size(image.width(), image.height());
        imageops::resize(image, width, height, FilterType::Lanczos3)
    }
}

/// Writes `bs-<t>.csv` / `pic-<t>.jpg` pairs
pub struct PersistenceSink<B: BlobStore> {
    store: Arc<B>,
    min_record_len: usize,
    target: ImageTarget,
    counters: Arc<StatsCounters>,
}

impl<B: BlobStore> PersistenceSink<B> {
    pub fn new(store: Arc<B>, min_record_len: usize, target: ImageTarget, counters: Arc<StatsCounters>) -> Self {
        Self {
            store,
            min_record_len,
            target,
            counters,
        }
    }

    /// Snapshot the state and schedule the writes. Returns false when
    /// the tick was skipped.
    pub fn tick(&self, state: &PipelineState, jobs: &mut JoinSet<()>) -> bool {
        let sample = state.snapshot();

        let Some(frame) = sample.frame else {
            tracing::debug!("no frame sampled yet, skipping save");
            self.counters.persist_skips.inc();
            return false;
        };
        if sample.record.len() <= self.min_record_len {
            tracing::debug!("record too short to save ({} bytes)", sample.record.len());
            self.counters.persist_skips.inc();
            return false;
        }

        self.counters.persisted_ticks.inc();
        let time = SampleTime::now();
        let store = Arc::clone(&self.store);
        let target = self.target;
        let counters = Arc::clone(&self.counters);
        let record = sample.record;

        jobs.spawn_blocking(move || write_pair(&*store, time, &record, &frame, &target, &counters));
        true
    }
}

fn write_pair<B: BlobStore>(
    store: &B,
    time: SampleTime,
    record: &Record,
    frame: &RawFrame,
    target: &ImageTarget,
    counters: &StatsCounters,
) {
    let names = ArtifactNames::for_time(time);

    if let Err(e) = store.write_text(&names.text, record.as_str()) {
        counters.text_write_failures.inc();
        tracing::warn!("failed to write {}: {}", names.text, e);
    }

    let result = ScaleTransform::fit(frame.width(), frame.height(), target)
        .and_then(|transform| store.write_image(&names.image, &transform.apply(frame.image()), target.quality));
    if let Err(e) = result {
        counters.image_write_failures.inc();
        tracing::warn!("failed to write {}: {}", names.image, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Recorded {
        texts: Mutex<BTreeMap<String, String>>,
        images: Mutex<BTreeMap<String, (u32, u32)>>,
        fail_text: bool,
    }

    impl BlobStore for Recorded {
        fn reset_session_dir(&self) -> BlendcastResult<()> {
            Ok(())
        }

        fn write_text(&self, name: &str, content: &str) -> BlendcastResult<()> {
            if self.fail_text {
                return Err(BlendcastError::Io(std::io::Error::other("disk full")));
            }
            self.texts.lock().insert(name.to_string(), content.to_string());
            Ok(())
        }

        fn write_image(&self, name: &str, image: &RgbImage, _quality: u8) -> BlendcastResult<()> {
            self.images.lock().insert(name.to_string(), image.dimensions());
            Ok(())
        }
    }

    fn long_record() -> Record {
        Record::from_text("0.000000,0.000000,0.000000")
    }

    async fn drain(jobs: &mut JoinSet<()>) {
        while jobs.join_next().await.is_some() {}
    }

    #[test]
    fn test_scale_transform_hits_target() {
        let target = ImageTarget::default();
        let transform = ScaleTransform::fit(1920, 1440, &target).unwrap();
        assert!((transform.scale - 0.25).abs() < 1e-12);
        assert_eq!(transform.output_size(1920, 1440), (640, 360));

        let transform = ScaleTransform::fit(1280, 720, &target).unwrap();
        assert_eq!(transform.output_size(1280, 720), (640, 360));
    }

    #[test]
    fn test_scale_transform_empty_source() {
        assert!(matches!(
            ScaleTransform::fit(0, 720, &ImageTarget::default()),
            Err(BlendcastError::EmptyFrame)
        ));
    }

    #[tokio::test]
    async fn test_writes_pair_with_same_stem() {
        let store = Arc::new(Recorded::default());
        let counters = Arc::new(StatsCounters::new());
        let sink = PersistenceSink::new(Arc::clone(&store), 10, ImageTarget::default(), Arc::clone(&counters));
        let state = PipelineState::new();
        state.commit_sample(long_record(), Some(RawFrame::filled(160, 120, [10, 20, 30])));

        let mut jobs = JoinSet::new();
        assert!(sink.tick(&state, &mut jobs));
        drain(&mut jobs).await;

        let texts = store.texts.lock();
        let images = store.images.lock();
        assert_eq!(texts.len(), 1);
        assert_eq!(images.len(), 1);

        let (text_name, content) = texts.iter().next().unwrap();
        let (image_name, size) = images.iter().next().unwrap();
        assert_eq!(content, long_record().as_str());
        assert_eq!(*size, (640, 360));
        assert_eq!(
            ArtifactNames::stem_of(text_name),
            ArtifactNames::stem_of(image_name)
        );
        assert_eq!(counters.snapshot().persisted_ticks, 1);
    }

    #[tokio::test]
    async fn test_skips_without_frame_or_short_record() {
        let store = Arc::new(Recorded::default());
        let counters = Arc::new(StatsCounters::new());
        let sink = PersistenceSink::new(Arc::clone(&store), 10, ImageTarget::default(), Arc::clone(&counters));
        let state = PipelineState::new();
        let mut jobs = JoinSet::new();

        // Nothing sampled
        assert!(!sink.tick(&state, &mut jobs));

        // Long record, no frame
        state.commit_sample(long_record(), None);
        assert!(!sink.tick(&state, &mut jobs));

        // Exactly ten bytes is still too short
        state.commit_sample(Record::from_text("0123456789"), Some(RawFrame::filled(4, 4, [0, 0, 0])));
        assert!(!sink.tick(&state, &mut jobs));

        drain(&mut jobs).await;
        assert!(store.texts.lock().is_empty());
        assert!(store.images.lock().is_empty());
        assert_eq!(counters.snapshot().persist_skips, 3);
    }

    #[tokio::test]
    async fn test_text_failure_does_not_block_image() {
        let store = Arc::new(Recorded {
            fail_text: true,
            ..Recorded::default()
        });
        let counters = Arc::new(StatsCounters::new());
        let sink = PersistenceSink::new(Arc::clone(&store), 10, ImageTarget::default(), Arc::clone(&counters));
        let state = PipelineState::new();
        state.commit_sample(long_record(), Some(RawFrame::filled(64, 48, [0, 0, 0])));

        let mut jobs = JoinSet::new();
        sink.tick(&state, &mut jobs);
        drain(&mut jobs).await;

        assert!(store.texts.lock().is_empty());
        assert_eq!(store.images.lock().len(), 1);
        assert_eq!(counters.snapshot().text_write_failures, 1);
        assert_eq!(counters.snapshot().image_write_failures, 0);
    }
}
