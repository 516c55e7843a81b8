//! Services and endpoints run against the in-memory sheet, with time controlled by the test.
use chrono::{DateTime, TimeDelta};
use repositories::SheetEngine;
use repositories::sheet::MemorySheet;
use std::sync::{Arc, Mutex};
use voting_core::model::UserEmail;
use voting_core::time::{Clock, Timestamp};

mod endpoints;
mod lifecycle;

type TestEngine = SheetEngine<MemorySheet, ManualClock>;

const START: &str = "2025-01-10T12:00:00+09:00";

#[derive(Debug, Clone)]
struct ManualClock(Arc<Mutex<Timestamp>>);

impl ManualClock {
    fn starting_at(start: &str) -> Self {
        Self(Arc::new(Mutex::new(at(start))))
    }

    fn advance(&self, by: TimeDelta) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }
}

fn at(date: &str) -> Timestamp {
    DateTime::parse_from_rfc3339(date).unwrap()
}

fn email(raw: &str) -> UserEmail {
    UserEmail::parse(raw).unwrap()
}

struct TestContext {
    sheet: MemorySheet,
    clock: ManualClock,
    engine: TestEngine,
}

impl TestContext {
    fn new() -> Self {
        let sheet = MemorySheet::new();
        let clock = ManualClock::starting_at(START);
        let engine = SheetEngine::with_clock(sheet.clone(), clock.clone());
        Self {
            sheet,
            clock,
            engine,
        }
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
