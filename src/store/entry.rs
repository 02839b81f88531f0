use crate::types::RedisValue;
use std::time::{SystemTime, UNIX_EPOCH};

/// Initial value for the LFU logarithmic counter, matching Redis's LFU_INIT_VAL.
const LFU_INIT_VAL: u8 = 5;
/// Minutes of idleness corresponding to one decrement of the LFU counter.
const LFU_DECAY_MINUTES: u64 = 1;

/// An entry in the data store — wraps a value with metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: RedisValue,
    /// Expiry time as milliseconds since UNIX epoch. None = no expiry.
    pub expires_at: Option<u64>,
    /// Last access time in seconds since UNIX epoch (for LRU eviction / OBJECT IDLETIME).
    pub last_access: u64,
    /// 8-bit logarithmic access counter used by the LFU eviction policies.
    pub freq: u8,
    /// Minutes-since-epoch (mod 2^16) at which `freq` was last decayed.
    pub freq_decay_clock: u16,
}

impl Entry {
    pub fn new(value: RedisValue) -> Self {
        Entry {
            value,
            expires_at: None,
            last_access: now_seconds(),
            freq: LFU_INIT_VAL,
            freq_decay_clock: decay_clock_now(),
        }
    }

    pub fn with_expiry(value: RedisValue, expires_at: u64) -> Self {
        Entry {
            value,
            expires_at: Some(expires_at),
            last_access: now_seconds(),
            freq: LFU_INIT_VAL,
            freq_decay_clock: decay_clock_now(),
        }
    }

    /// Build an entry from a value handed over from elsewhere (COPY, MOVE,
    /// RENAME), with fresh LRU/LFU bookkeeping rather than inherited history.
    pub fn from_parts(value: RedisValue, expires_at: Option<u64>) -> Self {
        Entry {
            value,
            expires_at,
            last_access: now_seconds(),
            freq: LFU_INIT_VAL,
            freq_decay_clock: decay_clock_now(),
        }
    }

    /// Update the last access time to now and bump the LFU counter.
    pub fn touch_access(&mut self) {
        self.last_access = now_seconds();
        self.decay_freq();
        self.log_incr_freq();
    }

    /// Return the idle time in seconds since last access.
    pub fn idle_seconds(&self) -> u64 {
        now_seconds().saturating_sub(self.last_access)
    }

    /// Probabilistically increment the logarithmic counter. The probability
    /// of incrementing shrinks as the counter grows so an 8-bit counter can
    /// represent an effectively unbounded number of accesses.
    fn log_incr_freq(&mut self) {
        if self.freq == u8::MAX {
            return;
        }
        let base = self.freq.saturating_sub(LFU_INIT_VAL) as f64;
        let p = 1.0 / (base * 10.0 + 1.0);
        if rand::random::<f64>() < p {
            self.freq += 1;
        }
    }

    /// Decay the counter based on minutes elapsed since the last decay.
    fn decay_freq(&mut self) {
        let now = decay_clock_now();
        let elapsed = now.wrapping_sub(self.freq_decay_clock) as u64;
        if elapsed == 0 {
            return;
        }
        let decrements = (elapsed / LFU_DECAY_MINUTES).min(255);
        self.freq = self.freq.saturating_sub(decrements as u8);
        self.freq_decay_clock = now;
    }

    /// Current LFU score with pending decay applied, without recording a
    /// fresh access (used by the eviction candidate scorer).
    pub fn lfu_score(&self) -> u8 {
        let now = decay_clock_now();
        let elapsed = now.wrapping_sub(self.freq_decay_clock) as u64;
        let decrements = (elapsed / LFU_DECAY_MINUTES).min(255);
        self.freq.saturating_sub(decrements as u8)
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_millis() >= exp,
            None => false,
        }
    }

    /// Time-to-live in seconds, or -1 if no expiry, or -2 if expired.
    pub fn ttl_seconds(&self) -> i64 {
        match self.expires_at {
            None => -1,
            Some(exp) => {
                let now = now_millis();
                if now >= exp {
                    -2
                } else {
                    ((exp - now + 500) / 1000) as i64
                }
            }
        }
    }

    /// Time-to-live in milliseconds, or -1 if no expiry, or -2 if expired.
    pub fn ttl_millis(&self) -> i64 {
        match self.expires_at {
            None => -1,
            Some(exp) => {
                let now = now_millis();
                if now >= exp { -2 } else { (exp - now) as i64 }
            }
        }
    }
}

/// Get current time in milliseconds since UNIX epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_millis() as u64
}

/// Get current time in seconds since UNIX epoch.
pub fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

fn decay_clock_now() -> u16 {
    (now_seconds() / 60) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::rstring::RedisString;

    #[test]
    fn new_entry_has_no_expiry_and_init_freq() {
        let e = Entry::new(RedisValue::String(RedisString::new(b"hi".to_vec())));
        assert_eq!(e.expires_at, None);
        assert_eq!(e.freq, LFU_INIT_VAL);
        assert!(!e.is_expired());
    }

    #[test]
    fn ttl_reports_expired_after_deadline() {
        let mut e = Entry::new(RedisValue::String(RedisString::new(b"hi".to_vec())));
        e.expires_at = Some(now_millis().saturating_sub(1));
        assert!(e.is_expired());
        assert_eq!(e.ttl_seconds(), -2);
    }
}
