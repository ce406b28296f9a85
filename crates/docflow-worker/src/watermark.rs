use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};

/// Latest modification time observed by a batch of concurrent workers.
///
/// Workers finish in any order; the value only ever moves forward, so the
/// final reading is the maximum of everything observed.
#[derive(Debug)]
pub struct Watermark {
    latest: Mutex<DateTime<Utc>>,
}

impl Watermark {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            latest: Mutex::new(initial),
        }
    }

    pub fn observe(&self, at: DateTime<Utc>) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if at > *latest {
            *latest = at;
        }
    }

    pub fn get(&self) -> DateTime<Utc> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
