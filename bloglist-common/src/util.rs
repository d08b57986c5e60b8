use thiserror::Error;
use time::Duration;

/// A strictly positive span of time, e.g. the lifetime of an auth token.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct PositiveDuration(Duration);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    pub fn from_seconds(seconds: i64) -> Result<Self, NonPositiveDurationError> {
        Duration::seconds(seconds).try_into()
    }

    #[must_use]
    pub fn get(self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn whole_seconds(self) -> i64 {
        self.0.whole_seconds()
    }
}

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[cfg(test)]
mod tests {
    use crate::util::PositiveDuration;
    use time::Duration;

    #[test]
    fn only_positive_durations() {
        assert_eq!(
            PositiveDuration::from_seconds(90).map(PositiveDuration::get),
            Ok(Duration::seconds(90))
        );
        assert!(PositiveDuration::from_seconds(0).is_err());
        assert!(PositiveDuration::from_seconds(-5).is_err());
        assert!(PositiveDuration::new(Duration::milliseconds(1)).is_some());
    }
}
