/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Access to the architectural system counter, shared by the normal-world
    client and the trusted application.
--*/

#![cfg_attr(target_os = "optee", no_std)]

mod arch;
mod convert;
mod counter;

pub use arch::{counter_source, read_counter, read_frequency, read_physical_counter};
pub use convert::{ticks_to_us, TeeTime, MICROS_PER_SECOND};
pub use counter::{ArchCounter, CounterSource, SysCounter};

/// One reading of the monotonic system counter.
pub type CounterSample = u64;

/// Counter increments per second.
pub type CounterFrequency = u32;
