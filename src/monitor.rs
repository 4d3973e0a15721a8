//! Monitoring Control Loop
//!
//! Single cooperative loop driving the whole sensor: channel hopping, ring
//! draining, alert updates, and the periodic reporting cycle. Nothing here
//! is preemptive — each concern is polled once per iteration, and the only
//! lock anywhere is the ring's bounded-wait drain lock.

use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alert::AlertEngine;
use crate::config::Config;
use crate::detect::classifier::FrameClassifier;
use crate::detect::discovery::{AddressNameCache, ChannelPlan, ChannelPlanner};
use crate::detect::hopper::ChannelHopScheduler;
use crate::detect::processor::EventProcessor;
use crate::detect::ring::capture_ring;
use crate::eventlog::EventSink;
use crate::report::{ApiReporter, Uplink};
use crate::session::SessionStore;
use crate::wireless::capture::{CaptureHandle, Radio};

/// Loop pacing; fine enough to honor a 75 ms hop interval
const TICK_MILLIS: u64 = 10;

/// Discrete operator input, one batch per loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Cycle the presentation view
    CycleView,
    /// Next page within the detailed view
    NextPage,
    /// Previous page within the detailed view
    PrevPage,
    /// Leave monitoring for the configuration portal
    EnterConfigMode,
}

/// Presentation cursor the display layer reads back
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewState {
    pub view: usize,
    pub page: usize,
}

/// Number of presentation views the cursor cycles through
const VIEW_COUNT: usize = 3;

/// The sensor: capture pipeline, alerting, and reporting under one loop
pub struct Sentinel<R: Radio> {
    config: Config,
    radio: R,
    session_id: Uuid,
    cache: AddressNameCache,
    plan: ChannelPlan,
    hopper: ChannelHopScheduler,
    processor: EventProcessor,
    store: SessionStore,
    alert: AlertEngine,
    sink: Box<dyn EventSink + Send>,
    reporter: ApiReporter,
    uplink: Box<dyn Uplink + Send>,
    capture: Option<CaptureHandle>,
    classifier: Option<FrameClassifier>,
    view: ViewState,
    last_report: Instant,
}

impl<R: Radio> Sentinel<R> {
    pub fn new(
        config: Config,
        radio: R,
        sink: Box<dyn EventSink + Send>,
        alert: AlertEngine,
        uplink: Box<dyn Uplink + Send>,
    ) -> Result<Self> {
        let (producer, consumer) = capture_ring(config.capture.ring_capacity);
        let classifier = FrameClassifier::new(producer);
        let processor = EventProcessor::new(consumer, config.detection.packet_threshold);
        let reporter = ApiReporter::new(config.api.clone())?;
        let hopper = ChannelHopScheduler::new(Vec::new(), config.detection.hop_interval());

        Ok(Self {
            config,
            radio,
            session_id: Uuid::new_v4(),
            cache: AddressNameCache::new(),
            plan: ChannelPlan::default(),
            hopper,
            processor,
            store: SessionStore::new(),
            alert,
            sink,
            reporter,
            uplink,
            capture: None,
            classifier: Some(classifier),
            view: ViewState::default(),
            last_report: Instant::now(),
        })
    }

    /// Scan for the monitored networks and rebuild the working channel set.
    /// Must run while capture is stopped.
    pub fn discover(&mut self) {
        self.alert.status_scanning();

        let planner = ChannelPlanner::new(
            self.config.detection.monitored_ssids.clone(),
            self.config.detection.channel_dwell(),
            self.config.detection.scan_all_when_none,
        );
        self.plan = planner.discover(&mut self.radio, &mut self.cache);
        self.hopper = ChannelHopScheduler::new(
            self.plan.working_set.clone(),
            self.config.detection.hop_interval(),
        );

        self.alert.status_ready();
        info!(
            "discovery: {} channels, {} known access points",
            self.plan.working_set.len(),
            self.cache.len()
        );
    }

    /// Register the classifier with the radio and start capture
    pub fn start_monitoring(&mut self) -> Result<()> {
        if self.capture.is_some() {
            return Ok(());
        }

        let Some(classifier) = self.classifier.take() else {
            anyhow::bail!("classifier already registered with the radio");
        };
        let handle = self.radio.start_capture(classifier)?;
        self.capture = Some(handle);
        self.hopper.reset(&mut self.radio, Instant::now());

        info!("session {}: monitoring started", self.session_id);
        Ok(())
    }

    /// Stop capture and quiesce: anything already buffered is drained so no
    /// capture is lost across the stop.
    pub fn stop_monitoring(&mut self) -> Result<()> {
        let Some(handle) = self.capture.take() else {
            return Ok(());
        };

        let classifier = self.radio.stop_capture(handle)?;
        self.classifier = Some(classifier);
        self.processor
            .drain(&self.cache, &mut self.store, self.sink.as_mut());

        info!("session {}: monitoring stopped", self.session_id);
        Ok(())
    }

    pub fn is_monitoring(&self) -> bool {
        self.capture.is_some()
    }

    /// One control-loop iteration. Returns true when the operator asked to
    /// leave monitoring for configuration.
    pub fn tick(&mut self, now: Instant, inputs: &[InputEvent]) -> bool {
        if self.is_monitoring() {
            self.hopper.poll(&mut self.radio, now);
        }

        self.processor
            .drain(&self.cache, &mut self.store, self.sink.as_mut());

        self.alert.update(now, self.store.len());

        let mut config_requested = false;
        for input in inputs {
            match input {
                InputEvent::CycleView => {
                    self.view.view = (self.view.view + 1) % VIEW_COUNT;
                    self.view.page = 0;
                }
                InputEvent::NextPage => self.view.page = self.view.page.saturating_add(1),
                InputEvent::PrevPage => self.view.page = self.view.page.saturating_sub(1),
                InputEvent::EnterConfigMode => config_requested = true,
            }
        }
        config_requested
    }

    /// Reporting cycle: when the interval has elapsed and there is anything
    /// to send, suspend capture, push the batch out, and clear the session —
    /// whether or not the send worked.
    pub async fn maybe_report(&mut self, now: Instant) -> Result<()> {
        if now.duration_since(self.last_report) < self.config.detection.reporting_interval() {
            return Ok(());
        }
        self.last_report = now;

        if self.store.is_empty() {
            return Ok(());
        }

        let was_monitoring = self.is_monitoring();
        if was_monitoring {
            self.stop_monitoring()?;
        }

        let batch = self.store.snapshot();
        match self.uplink.bring_up() {
            Ok(()) => {
                if let Err(e) = self.reporter.send_batch(&batch).await {
                    warn!("report failed, will retry next interval: {}", e);
                }
                self.uplink.bring_down();
            }
            Err(e) => {
                warn!("uplink unavailable, skipping report: {}", e);
            }
        }

        // Events and counters go regardless of the send result; the session
        // boundary is the reporting attempt, not its success.
        self.clear_session();

        if was_monitoring {
            self.start_monitoring()?;
        }
        Ok(())
    }

    /// Truncate the event list and reset the per-AP counters together.
    pub fn clear_session(&mut self) {
        let events = self.store.len();
        self.store.clear();
        self.processor.reset_counters();

        let previous = self.session_id;
        self.session_id = Uuid::new_v4();
        debug!(
            "session {} cleared ({} events); session {} begins",
            previous, events, self.session_id
        );
    }

    /// Run until shutdown is signaled or config mode is requested.
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        self.start_monitoring()?;

        loop {
            if shutdown.try_recv().is_ok() {
                info!("shutdown signal received");
                break;
            }

            let now = Instant::now();
            if self.tick(now, &[]) {
                break;
            }
            if let Err(e) = self.maybe_report(now).await {
                warn!("reporting cycle failed: {}", e);
            }

            tokio::time::sleep(std::time::Duration::from_millis(TICK_MILLIS)).await;
        }

        self.stop_monitoring()?;
        Ok(())
    }

    // Read-only accessors for the presentation layer

    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    pub fn channel_plan(&self) -> &ChannelPlan {
        &self.plan
    }

    pub fn name_cache(&self) -> &AddressNameCache {
        &self.cache
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Captures dropped at the ring since startup
    pub fn ring_dropped(&self) -> u64 {
        self.processor.ring_dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertTiming, LogSignaler};
    use crate::eventlog::NullSink;
    use crate::report::SystemUplink;
    use crate::testing::{MockNetwork, MockRadio};

    fn sentinel(config: Config) -> Sentinel<MockRadio> {
        let mut radio = MockRadio::new();
        radio.add_network(MockNetwork {
            ssid: "Home".to_string(),
            bssid: [0xaa; 6],
            channel: 6,
            signal_dbm: -50,
        });

        let alert = AlertEngine::new(AlertTiming::default(), Box::new(LogSignaler));
        Sentinel::new(
            config,
            radio,
            Box::new(NullSink),
            alert,
            Box::new(SystemUplink),
        )
        .unwrap()
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.detection.monitored_ssids = vec!["Home".to_string()];
        config.detection.reporting_interval_secs = 1;
        config
    }

    #[test]
    fn test_discovery_builds_plan_and_cache() {
        let mut s = sentinel(config());
        s.discover();

        assert_eq!(s.channel_plan().working_set, vec![6]);
        assert_eq!(s.channel_plan().channel_map.channel_for("Home"), Some(6));
        assert_eq!(s.name_cache().len(), 1);
    }

    #[test]
    fn test_start_stop_roundtrip() {
        let mut s = sentinel(config());
        s.discover();

        s.start_monitoring().unwrap();
        assert!(s.is_monitoring());
        // idempotent
        s.start_monitoring().unwrap();

        s.stop_monitoring().unwrap();
        assert!(!s.is_monitoring());
        // classifier came back; a second session can start
        s.start_monitoring().unwrap();
        s.stop_monitoring().unwrap();
    }

    #[test]
    fn test_view_inputs() {
        let mut s = sentinel(config());
        let now = Instant::now();

        assert!(!s.tick(now, &[InputEvent::CycleView, InputEvent::NextPage]));
        assert_eq!(s.view_state().view, 1);
        assert_eq!(s.view_state().page, 1);

        assert!(s.tick(now, &[InputEvent::EnterConfigMode]));
        assert!(!s.tick(now, &[InputEvent::PrevPage, InputEvent::PrevPage]));
        assert_eq!(s.view_state().page, 0);
    }

    #[tokio::test]
    async fn test_report_cycle_clears_even_when_send_fails() {
        let mut s = sentinel(config()); // no endpoint configured
        s.discover();

        // simulate a session with recorded events
        s.store.push(crate::session::DeauthEvent {
            timestamp: chrono::Utc::now(),
            target_ssid: "Home".to_string(),
            target_bssid: "AA:AA:AA:AA:AA:AA".to_string(),
            attacker_mac: "11:22:33:44:55:66".to_string(),
            channel: 6,
            rssi: -50,
            packet_count: 1,
        });
        let first_session = s.session_id();

        s.start_monitoring().unwrap();
        let later = Instant::now() + std::time::Duration::from_secs(2);
        s.maybe_report(later).await.unwrap();

        // send failed (no endpoint) but the session was cleared anyway and
        // monitoring resumed
        assert!(s.session().is_empty());
        assert_ne!(s.session_id(), first_session);
        assert!(s.is_monitoring());

        s.stop_monitoring().unwrap();
    }

    #[tokio::test]
    async fn test_report_cycle_skips_before_interval() {
        let mut s = sentinel(config());
        s.store.push(crate::session::DeauthEvent {
            timestamp: chrono::Utc::now(),
            target_ssid: "Home".to_string(),
            target_bssid: "AA:AA:AA:AA:AA:AA".to_string(),
            attacker_mac: "11:22:33:44:55:66".to_string(),
            channel: 6,
            rssi: -50,
            packet_count: 1,
        });

        s.maybe_report(Instant::now()).await.unwrap();
        assert_eq!(s.session().len(), 1);
    }
}
