//! Delay between attempts against the same provider.

use std::time::Duration;

/// Backoff strategy between same-provider attempts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Backoff {
    /// No pause; the next attempt starts immediately.
    #[default]
    None,
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally with +/- 50%
    /// jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Backoff {
    /// Exponential backoff starting at `base_ms`, or [`Backoff::None`] when
    /// `base_ms` is zero.
    pub fn from_base_millis(base_ms: u64) -> Self {
        if base_ms == 0 {
            return Self::None;
        }
        let base = Duration::from_millis(base_ms);
        Self::Exponential {
            base,
            factor: 2.0,
            max: base.saturating_mul(8),
            jitter: true,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                let capped = Duration::from_secs_f64(seconds.min(max.as_secs_f64()));

                if !jitter {
                    return capped;
                }
                let millis = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX);
                let spread = millis / 2;
                let offset = fastrand::u64(0..=spread.saturating_mul(2));
                Duration::from_millis((millis + offset).saturating_sub(spread))
            }
        }
    }
}
