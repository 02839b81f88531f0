//! Hierarchical time wheel for proactive TTL expiry.
//!
//! Each wheel covers `slots * tick` of time; deadlines further out cascade
//! into an overflow wheel created on demand, whose slots are `slots` times
//! coarser. On completing a rotation the overflow wheel advances one tick and
//! its fired bucket is re-inserted into the inner wheel at its true residual
//! deadline.

pub const DEFAULT_TICK_MS: u64 = 10;
pub const DEFAULT_SLOTS: usize = 512;

/// A pending deadline, tagged with the key it belongs to. The wheel never
/// deletes on its own — firing only returns candidates; the owning database
/// re-verifies the live deadline before actually removing the key.
#[derive(Debug, Clone)]
pub struct WheelEntry {
    pub key: String,
    pub deadline_ms: u64,
}

#[derive(Debug)]
pub struct TimeWheel {
    tick_ms: u64,
    slots: usize,
    cursor: usize,
    buckets: Vec<Vec<WheelEntry>>,
    overflow: Option<Box<TimeWheel>>,
}

impl TimeWheel {
    pub fn new(tick_ms: u64, slots: usize) -> Self {
        TimeWheel {
            tick_ms,
            slots,
            cursor: 0,
            buckets: (0..slots).map(|_| Vec::new()).collect(),
            overflow: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TICK_MS, DEFAULT_SLOTS)
    }

    /// Schedule `key` to be checked around `deadline_ms`. `now_ms` anchors the
    /// wheel's notion of "now" for computing how many ticks out the deadline
    /// sits.
    pub fn add(&mut self, now_ms: u64, key: String, deadline_ms: u64) {
        let remaining = deadline_ms.saturating_sub(now_ms);
        let ticks = (remaining / self.tick_ms) as usize;
        if ticks < self.slots {
            let slot = (self.cursor + ticks) % self.slots;
            self.buckets[slot].push(WheelEntry { key, deadline_ms });
        } else {
            let tick_ms = self.tick_ms;
            let slots = self.slots;
            let overflow = self
                .overflow
                .get_or_insert_with(|| Box::new(TimeWheel::new(tick_ms * slots as u64, slots)));
            overflow.add(now_ms, key, deadline_ms);
        }
    }

    /// Advance the wheel by one tick, returning the entries that landed in
    /// the slot that just became current. On completing a full rotation the
    /// overflow wheel (if any) is cascaded one tick and its fired entries are
    /// re-inserted at their true residual deadline.
    pub fn advance(&mut self, now_ms: u64) -> Vec<WheelEntry> {
        let fired = std::mem::take(&mut self.buckets[self.cursor]);
        self.cursor = (self.cursor + 1) % self.slots;
        if self.cursor == 0
            && let Some(overflow) = &mut self.overflow
        {
            let cascaded = overflow.advance(now_ms);
            for entry in cascaded {
                self.add(now_ms, entry.key, entry.deadline_ms);
            }
        }
        fired
    }
}

impl Default for TimeWheel {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_entry_on_its_own_slot() {
        let mut wheel = TimeWheel::new(10, 4);
        wheel.add(0, "k".to_string(), 25);
        // ticks = 25/10 = 2, so it lands two ticks from now.
        assert!(wheel.advance(10).is_empty());
        let fired = wheel.advance(20);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].key, "k");
    }

    #[test]
    fn cascades_from_overflow_on_full_rotation() {
        let mut wheel = TimeWheel::new(10, 4);
        // 1000ms deadline needs the overflow wheel (40ms per slot on the inner wheel * 4 = 160ms max).
        wheel.add(0, "far".to_string(), 1000);
        let mut now = 0u64;
        let mut seen = false;
        for _ in 0..200 {
            now += 10;
            if wheel.advance(now).iter().any(|e| e.key == "far") {
                seen = true;
                break;
            }
        }
        assert!(seen, "entry should eventually cascade down and fire");
    }

    #[test]
    fn remaining_time_of_zero_fires_on_next_tick() {
        let mut wheel = TimeWheel::new(10, 8);
        wheel.add(100, "now".to_string(), 100);
        let fired = wheel.advance(110);
        assert_eq!(fired.len(), 1);
    }
}
