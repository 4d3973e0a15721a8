//! Alert Engine
//!
//! Timed state machine that turns session-event growth into hardware
//! signaling: buzzer for a configured burst, indicator lit until the attack
//! has been silent for the configured gap and the hold period has run out.
//! Signaling commands go through the [`Signaler`] abstraction; their
//! failures never disturb the logical state.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Signaling errors (hardware I/O), logged and otherwise ignored
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device error: {0}")]
    Device(String),
}

/// Indicator colors, matching the sensor's status palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Off,
    /// Alert in progress
    Red,
    /// Connecting or scanning
    Yellow,
    /// Time/uplink sync
    Blue,
}

impl IndicatorColor {
    /// 24-bit RGB value for LED hardware
    pub fn rgb(&self) -> u32 {
        match self {
            IndicatorColor::Off => 0x000000,
            IndicatorColor::Red => 0xff0000,
            IndicatorColor::Yellow => 0xffff00,
            IndicatorColor::Blue => 0x0000ff,
        }
    }
}

/// Discrete hardware signaling commands issued by the alert engine
pub trait Signaler {
    fn set_indicator(&mut self, color: IndicatorColor) -> Result<(), SignalError>;
    fn set_buzzer(&mut self, on: bool) -> Result<(), SignalError>;
}

/// Signaler for headless deployments: state changes go to the log
#[derive(Debug, Default)]
pub struct LogSignaler;

impl Signaler for LogSignaler {
    fn set_indicator(&mut self, color: IndicatorColor) -> Result<(), SignalError> {
        info!("indicator: {:?}", color);
        Ok(())
    }

    fn set_buzzer(&mut self, on: bool) -> Result<(), SignalError> {
        info!("buzzer: {}", if on { "on" } else { "off" });
        Ok(())
    }
}

/// Alert timing configuration
#[derive(Debug, Clone)]
pub struct AlertTiming {
    /// How long the buzzer sounds after activation
    pub buzzer_duration: Duration,
    /// Quiet period required before the indicator may clear
    pub silence_gap: Duration,
    /// Minimum time the indicator stays lit after activation
    pub hold_duration: Duration,
}

impl Default for AlertTiming {
    fn default() -> Self {
        Self {
            buzzer_duration: Duration::from_secs(2),
            silence_gap: Duration::from_secs(30),
            hold_duration: Duration::from_secs(300),
        }
    }
}

/// Alert engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// No alert
    Idle,
    /// Alert raised; tracking time since the last observed event
    Active,
    /// Buzzer done, indicator lit as a reminder, counting down to clear
    Holding,
}

/// Event-count-driven alert state machine
pub struct AlertEngine {
    timing: AlertTiming,
    signaler: Box<dyn Signaler + Send>,
    state: AlertState,
    /// Session event count at the last update
    seen_events: usize,
    /// Idle→Active transition time; the hold countdown reference
    activated_at: Option<Instant>,
    /// Last observed event growth
    last_packet_at: Option<Instant>,
    buzzer_on: bool,
}

impl AlertEngine {
    pub fn new(timing: AlertTiming, signaler: Box<dyn Signaler + Send>) -> Self {
        Self {
            timing,
            signaler,
            state: AlertState::Idle,
            seen_events: 0,
            activated_at: None,
            last_packet_at: None,
            buzzer_on: false,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn is_alerting(&self) -> bool {
        self.state != AlertState::Idle
    }

    pub fn buzzer_is_on(&self) -> bool {
        self.buzzer_on
    }

    /// One control-loop tick: react to session-event growth and advance the
    /// timers. `event_count` is the current session store length; a smaller
    /// value than last tick means the session was cleared and is not growth.
    pub fn update(&mut self, now: Instant, event_count: usize) {
        // Buzzer burst runs out independently of the indicator; checked
        // before growth so a timeout and a refresh in the same tick leave
        // the machine Active.
        if self.buzzer_on {
            if let Some(activated) = self.activated_at {
                if now.duration_since(activated) > self.timing.buzzer_duration {
                    self.buzzer(false);
                    if self.state == AlertState::Active {
                        self.state = AlertState::Holding;
                        debug!("buzzer done, holding indicator");
                    }
                }
            }
        }

        let grew = event_count > self.seen_events;
        self.seen_events = event_count;

        if grew {
            match self.state {
                AlertState::Idle => self.activate(now),
                AlertState::Active | AlertState::Holding => {
                    // attack still in progress; keep the indicator lit and
                    // push the silence window out
                    self.last_packet_at = Some(now);
                    self.state = AlertState::Active;
                }
            }
        }

        // Clear once the attack has been silent long enough AND the hold
        // period has run out, whichever is later.
        if self.state != AlertState::Idle {
            let silent_long_enough = self
                .last_packet_at
                .map(|t| now.duration_since(t) > self.timing.silence_gap)
                .unwrap_or(false);
            let held_long_enough = self
                .activated_at
                .map(|t| now.duration_since(t) > self.timing.hold_duration)
                .unwrap_or(false);

            if silent_long_enough && held_long_enough {
                self.clear();
            }
        }
    }

    fn activate(&mut self, now: Instant) {
        self.state = AlertState::Active;
        self.activated_at = Some(now);
        self.last_packet_at = Some(now);
        self.buzzer(true);
        self.indicator(IndicatorColor::Red);
        info!("alert triggered");
    }

    fn clear(&mut self) {
        self.buzzer(false);
        self.indicator(IndicatorColor::Off);
        self.state = AlertState::Idle;
        self.activated_at = None;
        self.last_packet_at = None;
        info!("alert cleared after silence period");
    }

    /// Status indication outside of alerting, mirroring the sensor's boot
    /// sequence.
    pub fn status_connecting(&mut self) {
        self.indicator(IndicatorColor::Yellow);
    }

    pub fn status_syncing(&mut self) {
        self.indicator(IndicatorColor::Blue);
    }

    pub fn status_scanning(&mut self) {
        self.indicator(IndicatorColor::Yellow);
    }

    pub fn status_ready(&mut self) {
        self.indicator(IndicatorColor::Off);
    }

    fn indicator(&mut self, color: IndicatorColor) {
        if let Err(e) = self.signaler.set_indicator(color) {
            warn!("indicator write failed: {}", e);
        }
    }

    fn buzzer(&mut self, on: bool) {
        self.buzzer_on = on;
        if let Err(e) = self.signaler.set_buzzer(on) {
            warn!("buzzer write failed: {}", e);
        }
    }
}
