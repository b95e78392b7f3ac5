use std::time::Duration;

/// Linear backoff schedule for the long-lived conversational channel.
///
/// Delay grows as `base_delay × attempt` up to a fixed attempt cap; a
/// successful reconnect resets the counter. The one-shot job channel never
/// uses this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 5)
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the cap is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.base_delay * self.attempt)
    }

    /// Attempts made since the last reset.
    pub fn attempt(&self) -> u32 {
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
    fn delays_grow_linearly_until_the_cap() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(100), 5);
        let delays: Vec<_> = std::iter::from_fn(|| policy.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(400),
                Duration::from_millis(500),
            ]
        );
        assert_eq!(policy.attempt(), 5);
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn reset_starts_the_schedule_over() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(100), 5);
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.attempt(), 2);

        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
    }
}
