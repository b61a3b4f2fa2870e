// Licensed under the Apache-2.0 license

use core::fmt;

use crate::{CounterFrequency, CounterSample};

pub const MICROS_PER_SECOND: u64 = 1_000_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// Convert a tick count to microseconds, rounding to nearest.
///
/// The product is formed in 128 bits so no `u64` tick count can overflow,
/// and the division is exact integer arithmetic. A zero frequency yields 0.
pub fn ticks_to_us(frequency: CounterFrequency, ticks: u64) -> u64 {
    if frequency == 0 {
        return 0;
    }
    let freq = frequency as u128;
    let scaled = ticks as u128 * MICROS_PER_SECOND as u128;
    let us = (scaled + freq / 2) / freq;
    // Saturation is only reachable for frequencies below 1 MHz.
    u64::try_from(us).unwrap_or(u64::MAX)
}

/// Counter value split into whole seconds and milliseconds since the
/// counter was reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeeTime {
    pub seconds: u32,
    pub millis: u32,
}

impl TeeTime {
    pub fn from_ticks(ticks: CounterSample, frequency: CounterFrequency) -> Self {
        if frequency == 0 {
            return Self::default();
        }
        let freq = frequency as u64;
        let seconds = ticks / freq;
        let remainder = ticks % freq;
        Self {
            seconds: seconds as u32,
            millis: (remainder * MILLIS_PER_SECOND / freq) as u32,
        }
    }
}

impl fmt::Display for TeeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:5}.{:03}", self.seconds, self.millis)
    }
}
