//! Retry policy types and configuration.

use std::time::Duration;

/// How a retrying loader spaces out its attempts.
///
/// Policies are pure data: they describe retry behavior but don't execute it,
/// so they are easy to test, clone, and inspect.
///
/// At least one bound should be set (`max_retries` or `max_delay`); see
/// [`validate`](Self::validate). Unbounded retries are almost always a bug.
///
/// # Examples
///
/// ```rust
/// use reservoir::loader::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(100))
///     .with_max_retries(5);
///
/// assert_eq!(policy.max_retries(), Some(5));
/// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(400)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    max_retries: Option<u32>,
    max_delay: Option<Duration>,
}

/// The backoff strategy for retry delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Fixed delay between attempts.
    Constant(Duration),
    /// Delay increases linearly: base * (attempt + 1).
    Linear {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay doubles: base * 2^attempt.
    Exponential {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay follows the Fibonacci sequence: base * fib(attempt + 1).
    Fibonacci {
        /// Base delay duration.
        base: Duration,
    },
}

impl RetryPolicy {
    fn with_strategy(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            max_retries: None,
            max_delay: None,
        }
    }

    /// Constant delay between retries.
    pub fn constant(delay: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Constant(delay))
    }

    /// Linearly increasing delay: 1x, 2x, 3x the base.
    pub fn linear(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Linear { base })
    }

    /// Doubling delay: 1x, 2x, 4x the base.
    pub fn exponential(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Exponential { base })
    }

    /// Fibonacci delay: 1x, 1x, 2x, 3x, 5x the base.
    pub fn fibonacci(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Fibonacci { base })
    }

    /// Set the maximum number of retries.
    ///
    /// This does not include the initial attempt: `with_max_retries(3)` means
    /// up to 4 attempts in total.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Cap every delay at `d`, regardless of strategy.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Get the maximum number of retries.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Get the retry strategy.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// The delay before retry number `attempt` (0-indexed).
    ///
    /// Returns `None` once `max_retries` is used up.
    ///
    /// ```rust
    /// use reservoir::loader::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::constant(Duration::from_millis(500))
    ///     .with_max_retries(2);
    ///
    /// assert_eq!(policy.delay_for_attempt(0), Some(Duration::from_millis(500)));
    /// assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(500)));
    /// assert_eq!(policy.delay_for_attempt(2), None);
    /// ```
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_retries {
            if attempt >= max {
                return None;
            }
        }

        let delay = match &self.strategy {
            RetryStrategy::Constant(d) => *d,
            RetryStrategy::Linear { base } => base.saturating_mul(attempt.saturating_add(1)),
            RetryStrategy::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt))
            }
            RetryStrategy::Fibonacci { base } => {
                base.saturating_mul(fibonacci(attempt.saturating_add(1)))
            }
        };

        Some(match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        })
    }

    /// Check that the policy has at least one bound.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_retries.is_none() && self.max_delay.is_none() {
            Err("RetryPolicy must have at least one bound (max_retries or max_delay)")
        } else {
            Ok(())
        }
    }
}

fn fibonacci(n: u32) -> u32 {
    let (mut a, mut b) = (0u32, 1u32);
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    if n == 0 {
        0
    } else {
        b
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn ms(n: u64) -> Option<Duration> {
        Some(Duration::from_millis(n))
    }

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::linear(Duration::from_millis(100)).with_max_retries(5);
        assert_eq!(policy.delay_for_attempt(0), ms(100));
        assert_eq!(policy.delay_for_attempt(1), ms(200));
        assert_eq!(policy.delay_for_attempt(3), ms(400));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy::exponential(Duration::from_millis(100))
            .with_max_retries(10)
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(policy.delay_for_attempt(0), ms(100));
        assert_eq!(policy.delay_for_attempt(2), ms(400));
        assert_eq!(policy.delay_for_attempt(3), ms(500));
        assert_eq!(policy.delay_for_attempt(9), ms(500));
        assert_eq!(policy.delay_for_attempt(10), None);
    }

    #[test]
    fn test_fibonacci_delay() {
        let policy = RetryPolicy::fibonacci(Duration::from_millis(10)).with_max_retries(6);
        let delays: Vec<_> = (0..6).filter_map(|n| policy.delay_for_attempt(n)).collect();
        let expected: Vec<_> = [10, 10, 20, 30, 50, 80]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(delays, expected);
    }

    #[test]
    fn test_huge_attempts_saturate() {
        let policy = RetryPolicy::exponential(Duration::from_secs(1));
        assert!(policy.delay_for_attempt(u32::MAX).is_some());
    }

    #[test]
    fn test_validate_requires_a_bound() {
        assert!(RetryPolicy::constant(Duration::from_millis(1))
            .validate()
            .is_err());
        assert!(RetryPolicy::constant(Duration::from_millis(1))
            .with_max_retries(1)
            .validate()
            .is_ok());
        assert!(RetryPolicy::constant(Duration::from_millis(1))
            .with_max_delay(Duration::from_secs(1))
            .validate()
            .is_ok());
    }
}
