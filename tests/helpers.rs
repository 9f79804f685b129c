// Shared test helpers for building gates on a manual clock.
//
// Every sleep on a ManualClock resolves immediately and moves the clock to the
// deadline, so `clock.elapsed()` inside an operation is the admission time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use flood_guard::{AdmissionGate, Config, ManualClock};

/// Wall time every test clock starts at (midday, so calendar rollover is 12h away).
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Gate on a fresh manual clock starting at [`start_time`].
#[allow(dead_code)] // Used by other test files
pub fn gate_with(config: Config) -> (Arc<AdmissionGate>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let gate = gate_on(&config, &clock);
    (gate, clock)
}

/// Gate sharing an existing manual clock (e.g. to simulate a restart).
#[allow(dead_code)]
pub fn gate_on(config: &Config, clock: &Arc<ManualClock>) -> Arc<AdmissionGate> {
    Arc::new(AdmissionGate::new(config, clock.clone()).expect("valid test config"))
}

/// Asserts `actual` lies in `[expected, expected + 1ms)`.
#[allow(dead_code)]
pub fn assert_at(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(1),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}
