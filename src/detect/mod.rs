//! Capture-and-Correlate Pipeline
//!
//! The deauth detection core: the interrupt-context classifier, the SPSC
//! capture ring carrying its output to the control loop, channel discovery
//! and hopping, and the event processor that turns raw captures into
//! threshold-limited session events.

pub mod classifier;
pub mod discovery;
pub mod hopper;
pub mod processor;
pub mod ring;

pub use classifier::{FrameClassifier, FrameMeta};
pub use discovery::{AddressNameCache, ChannelMap, ChannelPlan, ChannelPlanner, ALL_CHANNELS};
pub use hopper::ChannelHopScheduler;
pub use processor::{EventProcessor, TransmitterCounters};
pub use ring::{capture_ring, DrainOutcome, RawCapture, RingConsumer, RingProducer};
