use rand::Rng;
use std::time::Duration;

/// Jittered exponential backoff between reconnect attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter_pct: f64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            jitter_pct: 0.0,
            attempt: 0,
        }
    }

    pub fn with_jitter(mut self, jitter_pct: f64) -> Self {
        self.jitter_pct = jitter_pct.clamp(0.0, 1.0);
        self
    }

    /// Delay before the next attempt; doubles per consecutive failure up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let exp = 2_u32.saturating_pow(self.attempt.min(16));
        self.attempt = self.attempt.saturating_add(1);
        let delay = self.base.saturating_mul(exp).min(self.max);

        if self.jitter_pct == 0.0 {
            return delay;
        }
        let spread = delay.as_millis() as f64 * self.jitter_pct;
        let delta = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_millis((delay.as_millis() as f64 + delta).max(0.0) as u64)
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
        assert_eq!(backoff.attempts(), 5);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn jitter_stays_within_spread() {
        let mut backoff =
            Backoff::new(Duration::from_millis(1_000), Duration::from_millis(1_000)).with_jitter(0.2);
        for _ in 0..100 {
            let delay = backoff.next_delay().as_millis();
            assert!((800..=1_200).contains(&delay), "delay {}", delay);
        }
    }
}
