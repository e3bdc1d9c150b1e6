//! Locally unique identifiers
//!
//! Ids are a base-36 millisecond timestamp followed by a base-36 random
//! suffix. The timestamp part never repeats within a process: a clock
//! reading at or before the last issued value is bumped past it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use uuid::Uuid;

/// Last timestamp component handed out by [`new_id`]
static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a new identifier
pub fn new_id() -> String {
    let millis = next_millis(Utc::now().timestamp_millis().max(0) as u64);
    // 64 random bits are plenty for the suffix
    let random = Uuid::new_v4().as_u128() as u64;
    format!("{}{}", to_base36(millis), to_base36(random))
}

/// Return a timestamp strictly greater than any previously returned one
fn next_millis(now: u64) -> u64 {
    let mut last = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_MILLIS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    // ALPHABET is ASCII
    digits.into_iter().map(char::from).collect()
}
