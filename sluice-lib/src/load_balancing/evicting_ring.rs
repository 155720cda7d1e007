use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::config::RingBufferConfig;
use crate::error::{Result, SluiceError};

/// Fixed-capacity ring of time-stamped entries, read in round-robin order.
///
/// `put` always succeeds and overwrites the oldest slot once the ring is full.
/// `get` returns the next live entry after the read cursor, where an entry is
/// live while its age is below the TTL. Expiry is evaluated at read time only:
/// dead slots are skipped, never cleared, so a longer TTL can bring them back.
///
/// Slots and cursors sit behind one lock. A `get` racing a `put` on the same
/// slot observes either the old or the new entry in full, whichever took the
/// lock first.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sluice_lib::clock::SettableClock;
/// use sluice_lib::load_balancing::EvictingRingBuffer;
///
/// let clock = Arc::new(SettableClock::default());
/// let ring = EvictingRingBuffer::new(4, Duration::from_secs(5), clock.clone())?;
/// ring.put("host-a");
/// ring.put("host-b");
/// assert_eq!(ring.get()?, "host-a");
/// assert_eq!(ring.get()?, "host-b");
/// assert_eq!(ring.get()?, "host-a");
///
/// clock.advance(Duration::from_secs(5));
/// assert!(ring.get().is_err());
/// # Ok::<(), sluice_lib::SluiceError>(())
/// ```
pub struct EvictingRingBuffer<T> {
    clock: Arc<dyn Clock>,
    ring: Mutex<Ring<T>>,
}

struct Ring<T> {
    slots: Vec<Option<Slot<T>>>,
    write: usize,
    read: usize,
    ttl: Duration,
}

struct Slot<T> {
    item: T,
    inserted_at: Duration,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize, ttl: Duration) -> Self {
        Self { slots: empty_slots(capacity), write: 0, read: 0, ttl }
    }

    fn is_live(&self, index: usize, now: Duration) -> bool {
        self.slots[index]
            .as_ref()
            .is_some_and(|slot| now.saturating_sub(slot.inserted_at) < self.ttl)
    }

    /// Index of the first live slot at or after the read cursor
    fn next_live(&self, now: Duration) -> Option<usize> {
        let capacity = self.slots.len();
        (0..capacity)
            .map(|offset| advance(self.read, offset, capacity))
            .find(|&index| self.is_live(index, now))
    }
}

impl<T: Clone> EvictingRingBuffer<T> {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        validate_capacity(capacity)?;
        validate_ttl(ttl)?;
        Ok(Self { clock, ring: Mutex::new(Ring::with_capacity(capacity, ttl)) })
    }

    pub fn from_config(config: &RingBufferConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::new(config.capacity, config.ttl(), clock)
    }

    /// Store `item` at the write cursor, replacing whatever was there
    pub fn put(&self, item: T) {
        let inserted_at = self.clock.now();
        let mut ring = self.lock();
        let index = ring.write;
        ring.slots[index] = Some(Slot { item, inserted_at });
        ring.write = advance(index, 1, ring.slots.len());
    }

    /// Next live entry in round-robin order.
    ///
    /// Fails with [`SluiceError::NoElement`] when no slot is live.
    pub fn get(&self) -> Result<T> {
        let now = self.clock.now();
        let mut ring = self.lock();
        let index = ring.next_live(now).ok_or(SluiceError::NoElement)?;
        ring.read = advance(index, 1, ring.slots.len());
        ring.slots[index]
            .as_ref()
            .map(|slot| slot.item.clone())
            .ok_or(SluiceError::NoElement)
    }

    /// Whether a `get` issued now would succeed. Does not move the read cursor.
    pub fn has_live(&self) -> bool {
        let now = self.clock.now();
        self.lock().next_live(now).is_some()
    }

    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn ttl(&self) -> Duration {
        self.lock().ttl
    }

    /// Resize the ring. All entries are discarded and both cursors reset.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        validate_capacity(capacity)?;
        let mut ring = self.lock();
        let ttl = ring.ttl;
        *ring = Ring::with_capacity(capacity, ttl);
        Ok(())
    }

    /// Change the TTL. Stored entries are judged against it on the next read.
    pub fn set_ttl(&self, ttl: Duration) -> Result<()> {
        validate_ttl(ttl)?;
        self.lock().ttl = ttl;
        Ok(())
    }

    /// Drop every entry, keeping capacity and TTL
    pub fn clear(&self) {
        let mut ring = self.lock();
        let (capacity, ttl) = (ring.slots.len(), ring.ttl);
        *ring = Ring::with_capacity(capacity, ttl);
    }

    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn empty_slots<T>(capacity: usize) -> Vec<Option<Slot<T>>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

fn advance(index: usize, by: usize, capacity: usize) -> usize {
    index.wrapping_add(by).checked_rem(capacity).unwrap_or(0)
}

fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(SluiceError::InvalidArgument("capacity must be at least 1".into()));
    }
    Ok(())
}

fn validate_ttl(ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(SluiceError::InvalidArgument("ttl must be greater than 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps() {
        assert_eq!(advance(0, 1, 3), 1);
        assert_eq!(advance(2, 1, 3), 0);
        assert_eq!(advance(2, 2, 3), 1);
        assert_eq!(advance(5, 0, 0), 0);
    }

    #[test]
    fn dead_slots_are_skipped_not_cleared() {
        let mut ring: Ring<u8> = Ring::with_capacity(3, Duration::from_millis(10));
        ring.slots[0] = Some(Slot { item: 1, inserted_at: Duration::ZERO });
        ring.slots[2] = Some(Slot { item: 3, inserted_at: Duration::from_millis(8) });

        assert_eq!(ring.next_live(Duration::from_millis(12)), Some(2));
        assert!(ring.slots[0].is_some());

        ring.ttl = Duration::from_millis(20);
        assert_eq!(ring.next_live(Duration::from_millis(12)), Some(0));
    }
}
