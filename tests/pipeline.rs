//! End-to-end pipeline tests: synthetic deauth frames through the
//! classifier, capture ring, event processor, session store, log sink, and
//! alert engine — the same path live captures take, minus the radio.

use std::time::{Duration, Instant};

use deauthmon::alert::{AlertEngine, AlertState, AlertTiming, LogSignaler};
use deauthmon::detect::classifier::{FrameClassifier, FrameMeta};
use deauthmon::detect::discovery::AddressNameCache;
use deauthmon::detect::processor::EventProcessor;
use deauthmon::detect::ring::capture_ring;
use deauthmon::eventlog::{CsvEventLog, NullSink};
use deauthmon::session::{SessionStore, UNKNOWN_SSID};
use deauthmon::testing::deauth_frame;
use deauthmon::wireless::ieee80211::MacAddr;

const AP: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
const ATTACKER: [u8; 6] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

const META: FrameMeta = FrameMeta {
    channel: 6,
    rssi: -48,
};

#[test]
fn burst_is_threshold_limited_and_raises_the_alert() {
    let (tx, rx) = capture_ring(64);
    let classifier = FrameClassifier::new(tx);
    let mut processor = EventProcessor::new(rx, 2);

    let mut cache = AddressNameCache::new();
    cache.insert(MacAddr::new(AP), "Home".to_string());
    let mut store = SessionStore::new();
    let mut alert = AlertEngine::new(AlertTiming::default(), Box::new(LogSignaler));

    // three deauth frames against the same AP in rapid succession
    let frame = deauth_frame(ATTACKER, AP);
    for _ in 0..3 {
        classifier.classify(&frame, META);
    }

    processor.drain(&cache, &mut store, &mut NullSink);

    // threshold 2: exactly two events, counts 1 and 2
    assert_eq!(store.len(), 2);
    let counts: Vec<u32> = store.events().iter().map(|e| e.packet_count).collect();
    assert_eq!(counts, vec![1, 2]);

    let first = &store.events()[0];
    assert_eq!(first.target_ssid, "Home");
    assert_eq!(first.target_bssid, "AA:BB:CC:DD:EE:FF");
    assert_eq!(first.attacker_mac, "11:22:33:44:55:66");
    assert_eq!(first.channel, 6);
    assert_eq!(first.rssi, -48);

    // the control loop notices the growth and raises the alert
    let now = Instant::now();
    alert.update(now, store.len());
    assert_eq!(alert.state(), AlertState::Active);
    assert!(alert.buzzer_is_on());
}

#[test]
fn unknown_ap_gets_the_sentinel_name() {
    let (tx, rx) = capture_ring(64);
    let classifier = FrameClassifier::new(tx);
    let mut processor = EventProcessor::new(rx, 10);

    let cache = AddressNameCache::new();
    let mut store = SessionStore::new();

    classifier.classify(&deauth_frame(ATTACKER, [0x99; 6]), META);
    processor.drain(&cache, &mut store, &mut NullSink);

    assert_eq!(store.len(), 1);
    assert_eq!(store.events()[0].target_ssid, UNKNOWN_SSID);
}

#[test]
fn producer_thread_and_consumer_loop_agree() {
    let (tx, rx) = capture_ring(128);
    let classifier = FrameClassifier::new(tx);
    let mut processor = EventProcessor::new(rx, u32::MAX);

    let cache = AddressNameCache::new();
    let mut store = SessionStore::new();

    // the "interrupt context": a capture thread classifying a frame burst
    let producer = std::thread::spawn(move || {
        let frame = deauth_frame(ATTACKER, AP);
        for _ in 0..500 {
            classifier.classify(&frame, META);
            std::thread::sleep(Duration::from_micros(50));
        }
        classifier
    });

    // the control loop: drain until the producer is done, then once more
    while !producer.is_finished() {
        processor.drain(&cache, &mut store, &mut NullSink);
        std::thread::sleep(Duration::from_millis(1));
    }
    let classifier = producer.join().unwrap();
    processor.drain(&cache, &mut store, &mut NullSink);

    // nothing conjured out of thin air: emitted + ring-dropped = produced
    let dropped = classifier.dropped();
    assert_eq!(store.len() as u64 + dropped, 500);

    // packet_count runs 1..=N with no gaps
    for (i, event) in store.events().iter().enumerate() {
        assert_eq!(event.packet_count as usize, i + 1);
    }
}

#[test]
fn session_log_records_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvEventLog::create(dir.path()).unwrap();

    let (tx, rx) = capture_ring(64);
    let classifier = FrameClassifier::new(tx);
    let mut processor = EventProcessor::new(rx, 10);

    let mut cache = AddressNameCache::new();
    cache.insert(MacAddr::new(AP), "Home".to_string());
    let mut store = SessionStore::new();

    classifier.classify(&deauth_frame(ATTACKER, AP), META);
    classifier.classify(&deauth_frame(ATTACKER, AP), META);
    processor.drain(&cache, &mut store, &mut sink);

    let content = std::fs::read_to_string(sink.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3); // header + two events
    assert!(lines[1].contains("\"Home\""));
    assert!(lines[2].contains(",2")); // packet_count of the second event
}

#[test]
fn alert_clears_after_silence_plus_hold() {
    let timing = AlertTiming {
        buzzer_duration: Duration::from_secs(2),
        silence_gap: Duration::from_secs(30),
        hold_duration: Duration::from_secs(300),
    };
    let mut alert = AlertEngine::new(timing, Box::new(LogSignaler));

    let t0 = Instant::now();
    alert.update(t0, 1);
    assert_eq!(alert.state(), AlertState::Active);

    // buzzer burns out, indicator holds
    alert.update(t0 + Duration::from_secs(5), 1);
    assert_eq!(alert.state(), AlertState::Holding);
    assert!(!alert.buzzer_is_on());

    // silence satisfied, hold not yet
    alert.update(t0 + Duration::from_secs(200), 1);
    assert!(alert.is_alerting());

    // first check past max(t0+30, t0+300)
    alert.update(t0 + Duration::from_secs(301), 1);
    assert_eq!(alert.state(), AlertState::Idle);
}
