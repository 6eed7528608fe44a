//! Session lifecycle and the scheduler loop
//!
//! A session owns one scheduler task. The three timers are selected in
//! that single task, so a sampling tick, a message tick and a file-save
//! tick never run at the same time. Publishes and artifact writes are
//! spawned onto a `JoinSet` that the scheduler reaps as it goes and
//! drains completely before it exits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use blendcast_core::{BlendcastError, BlendcastResult, SessionId};
use blendcast_store::BlobStore;
use blendcast_transport::Transport;
use blendcast_visual::{BodyPointDetector, MarkerSurface, OrientationEstimator};
use blendcast_wire::RecordEncoder;

use crate::{
    ChangeGate, Dispatcher, GateDecision, OverlayStage, PersistenceSink, PipelineConfig, PipelineState,
    RuntimeStats, Sampler, StatsCounters, TrackingSource,
};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// A running pipeline
pub struct Session {
    id: SessionId,
    state: Arc<PipelineState>,
    counters: Arc<StatsCounters>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Validate `config`, empty the session directory and start the
    /// scheduler. A session directory that cannot be reset is logged and
    /// the session runs anyway; the individual writes will then fail.
    pub async fn start<Src, E, T, B, S, D>(
        config: PipelineConfig,
        source: Src,
        transport: T,
        store: B,
        estimator: E,
        overlay: OverlayStage<S, D>,
    ) -> BlendcastResult<Session>
    where
        Src: TrackingSource,
        E: OrientationEstimator + 'static,
        T: Transport,
        B: BlobStore,
        S: MarkerSurface + 'static,
        D: BodyPointDetector + 'static,
    {
        config.validate()?;

        let id = SessionId::new(NEXT_SESSION.fetch_add(1, Ordering::Relaxed));
        let store = Arc::new(store);

        let reset = {
            let store = Arc::clone(&store);
            tokio::task::spawn_blocking(move || store.reset_session_dir()).await
        };
        match reset {
            Ok(Ok(())) => tracing::debug!("{} session directory ready", id),
            Ok(Err(e)) => tracing::error!("{} could not reset session directory: {}", id, e),
            Err(e) => tracing::error!("{} session directory reset aborted: {}", id, e),
        }

        let state = Arc::new(PipelineState::new());
        let counters = Arc::new(StatsCounters::new());

        let overlay = if config.overlay_enabled { Some(overlay) } else { None };
        let scheduler = Scheduler {
            id,
            sampler: Sampler::new(source, estimator, RecordEncoder::new(config.record_layout), overlay),
            gate: ChangeGate,
            dispatcher: Dispatcher::new(
                Arc::new(transport),
                config.channel_id(),
                config.publish_timeout(),
                Arc::clone(&counters),
            ),
            sink: PersistenceSink::new(store, config.min_record_len, config.image_target, Arc::clone(&counters)),
            state: Arc::clone(&state),
            counters: Arc::clone(&counters),
            jobs: JoinSet::new(),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(scheduler.run(
            shutdown_rx,
            config.image_process_interval(),
            config.message_interval(),
            config.file_save_interval(),
        ));

        tracing::info!(
            "{} started (layout {}, channel {})",
            id,
            config.record_layout,
            config.channel
        );

        Ok(Session {
            id,
            state,
            counters,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    pub fn stats(&self) -> RuntimeStats {
        self.counters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Stop the timers, wait for in-flight publishes and writes, then
    /// release the pipeline state
    pub async fn stop(mut self) -> BlendcastResult<RuntimeStats> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        let joined = match self.task.take() {
            Some(task) => task.await,
            None => Ok(()),
        };

        self.state.reset();
        let stats = self.counters.snapshot();

        match joined {
            Ok(()) => {
                tracing::info!("{} stopped: {:?}", self.id, stats);
                Ok(stats)
            }
            Err(e) => {
                tracing::error!("{} scheduler ended abnormally: {}", self.id, e);
                Err(BlendcastError::SchedulerFailed(e.to_string()))
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Scheduler<Src, E, S, D, T, B>
where
    Src: TrackingSource,
    E: OrientationEstimator,
    S: MarkerSurface,
    D: BodyPointDetector,
    T: Transport,
    B: BlobStore,
{
    id: SessionId,
    sampler: Sampler<Src, E, S, D>,
    gate: ChangeGate,
    dispatcher: Dispatcher<T>,
    sink: PersistenceSink<B>,
    state: Arc<PipelineState>,
    counters: Arc<StatsCounters>,
    jobs: JoinSet<()>,
}

fn timer(period: Duration) -> Interval {
    // First tick one period after start
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

impl<Src, E, S, D, T, B> Scheduler<Src, E, S, D, T, B>
where
    Src: TrackingSource,
    E: OrientationEstimator,
    S: MarkerSurface,
    D: BodyPointDetector,
    T: Transport,
    B: BlobStore,
{
    async fn run(
        mut self,
        mut shutdown: oneshot::Receiver<()>,
        sample_period: Duration,
        message_period: Duration,
        save_period: Duration,
    ) {
        let mut sample_timer = timer(sample_period);
        let mut message_timer = timer(message_period);
        let mut save_timer = timer(save_period);

        loop {
            tokio::select! {
                biased;

                // Fires on stop and when the session handle is dropped
                _ = &mut shutdown => break,

                _ = sample_timer.tick() => {
                    self.sampler.sample(&self.state, &self.counters);
                }

                _ = message_timer.tick() => self.on_message(),

                _ = save_timer.tick() => {
                    self.sink.tick(&self.state, &mut self.jobs);
                }

                Some(result) = self.jobs.join_next(), if !self.jobs.is_empty() => reap(self.id, result),
            }
        }

        let in_flight = self.jobs.len();
        if in_flight > 0 {
            tracing::debug!("{} waiting for {} in-flight jobs", self.id, in_flight);
        }
        while let Some(result) = self.jobs.join_next().await {
            reap(self.id, result);
        }
    }

    fn on_message(&mut self) {
        match self.gate.evaluate(&self.state) {
            GateDecision::Blank => {
                self.counters.blank_skips.inc();
                self.sampler.clear_overlay();
            }
            GateDecision::Unchanged => self.counters.unchanged_skips.inc(),
            GateDecision::Dispatch(record) => self.dispatcher.dispatch(record, &mut self.jobs),
        }
    }
}

fn reap(id: SessionId, result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::warn!("{} background job panicked: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blendcast_core::RawFrame;
    use blendcast_store::FsBlobStore;
    use blendcast_transport::LocalTransport;
    use blendcast_visual::{ExpressionFrame, GeometricEstimator, HeadTransform};
    use tempfile::TempDir;

    struct Steady;

    impl TrackingSource for Steady {
        fn current_expression_frame(&mut self) -> Option<ExpressionFrame> {
            Some(ExpressionFrame::neutral())
        }

        fn current_head_transform(&mut self) -> Option<HeadTransform> {
            Some(HeadTransform::IDENTITY)
        }

        fn current_raw_frame(&mut self) -> Option<RawFrame> {
            Some(RawFrame::filled(32, 24, [90, 90, 90]))
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            image_process_interval_secs: 0.0,
            ..PipelineConfig::default()
        };
        let result = Session::start(
            config,
            Steady,
            LocalTransport::new(),
            FsBlobStore::new(dir.path(), "mopac"),
            GeometricEstimator::new(),
            OverlayStage::null(),
        )
        .await;
        assert!(matches!(result, Err(BlendcastError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_source_publishes_once() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(LocalTransport::new());
        let mut rx = transport.subscribe(&PipelineConfig::default().channel_id());

        let session = Session::start(
            PipelineConfig::default(),
            Steady,
            Arc::clone(&transport),
            FsBlobStore::new(dir.path(), "mopac"),
            GeometricEstimator::new(),
            OverlayStage::null(),
        )
        .await
        .unwrap();
        assert!(session.is_running());

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let stats = session.stop().await.unwrap();

        assert!(stats.samples >= 9);
        assert_eq!(stats.dispatched, 1);
        assert!(stats.unchanged_skips >= 1);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.body.split(',').count(), 54);
        assert!(rx.try_recv().is_err());
    }

    struct Crashing;

    impl TrackingSource for Crashing {
        fn current_expression_frame(&mut self) -> Option<ExpressionFrame> {
            panic!("tracker lost");
        }

        fn current_head_transform(&mut self) -> Option<HeadTransform> {
            None
        }

        fn current_raw_frame(&mut self) -> Option<RawFrame> {
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_scheduler_reported_on_stop() {
        let dir = TempDir::new().unwrap();
        let session = Session::start(
            PipelineConfig::default(),
            Crashing,
            LocalTransport::new(),
            FsBlobStore::new(dir.path(), "mopac"),
            GeometricEstimator::new(),
            OverlayStage::null(),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!session.is_running());
        assert!(matches!(session.stop().await, Err(BlendcastError::SchedulerFailed(_))));
    }

    #[tokio::test]
    async fn test_drop_stops_scheduler() {
        let dir = TempDir::new().unwrap();
        let session = Session::start(
            PipelineConfig::default(),
            Steady,
            LocalTransport::new(),
            FsBlobStore::new(dir.path(), "mopac"),
            GeometricEstimator::new(),
            OverlayStage::null(),
        )
        .await
        .unwrap();
        let state = Arc::clone(session.state());
        drop(session);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(state.snapshot().record.is_empty());
    }
}
