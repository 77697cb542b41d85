use std::time::Duration;

use backoff::{backoff::Backoff, exponential::ExponentialBackoffBuilder, ExponentialBackoff};

/// How long and how often to keep trying an operation that may succeed later: HTTP requests
/// hitting a rate limit, transaction status polling, event polling.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum RetryConfiguration {
    Constant(ConstantRetryConfiguration),
    Exponential(ExponentialRetryConfiguration),
}

impl RetryConfiguration {
    pub fn constant(max_attempts: u64, cooldown: Duration) -> Self {
        RetryConfiguration::Constant(ConstantRetryConfiguration { max_attempts, cooldown })
    }

    pub fn exponential(
        initial_interval: Duration,
        multiplier: f64,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
    ) -> Self {
        RetryConfiguration::Exponential(ExponentialRetryConfiguration::new(
            initial_interval,
            multiplier,
            max_interval,
            max_elapsed_time,
        ))
    }

    /// Transport default: start at 250ms, grow by 75% per failure, wait at most 30s between
    /// attempts and give up after roughly two minutes.
    pub fn transport_default() -> Self {
        Self::exponential(
            Duration::from_millis(250),
            1.75,
            Duration::from_secs(30),
            Some(Duration::from_secs(125)),
        )
    }

    /// Polling default used by the transaction watcher and event subscriptions.
    pub fn polling_default() -> Self {
        Self::constant(600, Duration::from_secs(1))
    }

    /// Fresh schedule of delays between polling attempts.
    ///
    /// A constant configuration is bounded by its attempt count rather than by wall clock time.
    pub fn schedule(&self) -> RetrySchedule {
        let mut backoff = self.to_backoff();
        let max_attempts = match self {
            RetryConfiguration::Constant(c) => {
                backoff.max_elapsed_time = None;
                Some(c.max_attempts)
            }
            RetryConfiguration::Exponential(_) => None,
        };
        RetrySchedule { backoff, max_attempts, attempts: 0 }
    }

    /// Backoff policy for the HTTP transport. A constant configuration becomes a backoff that
    /// never grows.
    pub fn to_backoff(&self) -> ExponentialBackoff {
        match self {
            RetryConfiguration::Constant(c) => ExponentialBackoffBuilder::new()
                .with_initial_interval(c.cooldown)
                .with_multiplier(1.0)
                .with_randomization_factor(0.0)
                .with_max_interval(c.cooldown)
                .with_max_elapsed_time(
                    u32::try_from(c.max_attempts)
                        .ok()
                        .and_then(|n| c.cooldown.checked_mul(n)),
                )
                .build(),
            RetryConfiguration::Exponential(e) => ExponentialBackoffBuilder::new()
                .with_initial_interval(e.initial_interval)
                .with_multiplier(e.multiplier)
                .with_max_interval(e.max_interval)
                .with_max_elapsed_time(e.max_elapsed_time)
                .build(),
        }
    }
}

/// Delays handed out by [`RetryConfiguration::schedule`]; `None` once retrying should stop.
#[derive(Debug)]
pub struct RetrySchedule {
    backoff: ExponentialBackoff,
    max_attempts: Option<u64>,
    attempts: u64,
}

impl Backoff for RetrySchedule {
    fn reset(&mut self) {
        self.attempts = 0;
        self.backoff.reset();
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self
            .max_attempts
            .is_some_and(|max| self.attempts >= max)
        {
            return None;
        }
        self.attempts += 1;
        self.backoff.next_backoff()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstantRetryConfiguration {
    max_attempts: u64,
    cooldown: Duration,
}

impl ConstantRetryConfiguration {
    pub fn max_attempts(&self) -> u64 {
        self.max_attempts
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExponentialRetryConfiguration {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
    max_elapsed_time: Option<Duration>,
}

impl ExponentialRetryConfiguration {
    pub fn new(
        initial_interval: Duration,
        multiplier: f64,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
    ) -> Self {
        Self { initial_interval, multiplier, max_interval, max_elapsed_time }
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn max_elapsed_time(&self) -> Option<Duration> {
        self.max_elapsed_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_schedule_counts_attempts() {
        let mut schedule = RetryConfiguration::constant(2, Duration::from_millis(10)).schedule();

        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(10)));
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(10)));
        assert_eq!(schedule.next_backoff(), None);

        schedule.reset();
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_exponential_schedule_grows_until_capped() {
        let config = RetryConfiguration::exponential(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(300),
            None,
        );
        let mut schedule = config.schedule();

        // default randomization spreads each delay by up to half the interval
        let delays: Vec<_> = (0..4)
            .map(|_| schedule.next_backoff().expect("unbounded"))
            .collect();
        assert!(delays[0] >= Duration::from_millis(50) && delays[0] < Duration::from_millis(151));
        assert!(delays[3] >= Duration::from_millis(150) && delays[3] < Duration::from_millis(451));
    }

    #[test]
    fn test_unbounded_exponential_schedule_stays_capped() {
        let mut schedule = RetryConfiguration::exponential(
            Duration::from_millis(250),
            1.75,
            Duration::from_secs(30),
            None,
        )
        .schedule();

        for _ in 0..1000 {
            let delay = schedule.next_backoff().expect("unbounded");
            assert!(delay < Duration::from_secs(46));
        }
    }

    #[test]
    fn test_constant_to_backoff_with_huge_attempt_count() {
        let backoff = RetryConfiguration::constant(u64::MAX, Duration::from_secs(1)).to_backoff();

        assert_eq!(backoff.max_elapsed_time, None);
        assert_eq!(backoff.max_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_to_backoff_keeps_intervals() {
        let backoff = RetryConfiguration::transport_default().to_backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(250));
        assert_eq!(backoff.max_interval, Duration::from_secs(30));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(125)));
    }
}
