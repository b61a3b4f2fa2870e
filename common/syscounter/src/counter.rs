// Licensed under the Apache-2.0 license

use crate::{arch, convert, CounterFrequency, CounterSample};

/// Identifies the physical counter behind a [`SysCounter`].
///
/// Two samples may only be subtracted when both were produced by the same
/// source at the same frequency.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSource {
    /// Arm generic timer (CNTVCT), shared by the normal and secure worlds.
    ArmGenericTimer = 1,
    /// Process-local monotonic clock used on hosts without a shared counter.
    HostMonotonic = 2,
}

impl CounterSource {
    /// Convert from the raw value carried in a counter info response.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(CounterSource::ArmGenericTimer),
            2 => Some(CounterSource::HostMonotonic),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CounterSource::ArmGenericTimer => "arm-generic-timer",
            CounterSource::HostMonotonic => "host-monotonic",
        }
    }
}

impl From<CounterSource> for u32 {
    fn from(source: CounterSource) -> Self {
        source as u32
    }
}

/// A monotonic tick counter with a fixed frequency.
pub trait SysCounter {
    /// Current tick count.
    fn ticks(&self) -> CounterSample;

    /// Ticks per second.
    fn frequency(&self) -> CounterFrequency;

    /// Which counter produces the ticks.
    fn source(&self) -> CounterSource;

    /// Microseconds between two tick values, rounded to nearest.
    fn elapsed_us(&self, start: CounterSample, end: CounterSample) -> u64 {
        convert::ticks_to_us(self.frequency(), end.saturating_sub(start))
    }
}

/// The architectural system counter of the running CPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchCounter;

impl ArchCounter {
    pub const fn new() -> Self {
        Self
    }
}

impl SysCounter for ArchCounter {
    #[inline(always)]
    fn ticks(&self) -> CounterSample {
        arch::read_counter()
    }

    fn frequency(&self) -> CounterFrequency {
        arch::read_frequency()
    }

    fn source(&self) -> CounterSource {
        arch::counter_source()
    }
}

impl<T: SysCounter + ?Sized> SysCounter for &T {
    fn ticks(&self) -> CounterSample {
        (**self).ticks()
    }

    fn frequency(&self) -> CounterFrequency {
        (**self).frequency()
    }

    fn source(&self) -> CounterSource {
        (**self).source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCounter(u32);

    impl SysCounter for FixedCounter {
        fn ticks(&self) -> CounterSample {
            0
        }

        fn frequency(&self) -> CounterFrequency {
            self.0
        }

        fn source(&self) -> CounterSource {
            CounterSource::ArmGenericTimer
        }
    }

    #[test]
    fn test_source_raw_values() {
        use CounterSource::{ArmGenericTimer, HostMonotonic};
        for source in [ArmGenericTimer, HostMonotonic] {
            assert_eq!(CounterSource::from_raw(source.into()), Some(source));
        }
        assert_eq!(CounterSource::from_raw(0), None);
        assert_eq!(CounterSource::from_raw(3), None);
    }

    #[test]
    fn test_elapsed_us() {
        let counter = FixedCounter(24_000_000);
        assert_eq!(counter.elapsed_us(1_000, 1_000), 0);
        assert_eq!(counter.elapsed_us(0, 24_000), 1_000);
        // An inverted pair clamps instead of wrapping.
        assert_eq!(counter.elapsed_us(10, 5), 0);
    }

    #[test]
    fn test_arch_counter_matches_free_functions() {
        let counter = ArchCounter::new();
        assert_eq!(counter.frequency(), arch::read_frequency());
        assert_eq!(counter.source(), arch::counter_source());
        let a = counter.ticks();
        let b = arch::read_counter();
        assert!(b >= a);
    }
}
