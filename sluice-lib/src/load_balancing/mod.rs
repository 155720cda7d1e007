mod evicting_ring;

pub use evicting_ring::EvictingRingBuffer;
