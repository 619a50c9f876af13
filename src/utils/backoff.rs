use rand::Rng;
use std::time::Duration;

/// `base` plus a uniform random extra in `[0, jitter]`.
///
/// Kept synchronous so the thread-local RNG never lives across an `.await`.
pub fn jittered(base: Duration, jitter: Duration) -> Duration {
    let jitter_ms = jitter.as_millis() as u64;
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
}
