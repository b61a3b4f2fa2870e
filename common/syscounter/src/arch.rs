// Licensed under the Apache-2.0 license

//! Raw register access.
//!
//! The Arm generic timer is visible from both the normal world and the
//! secure world, so samples taken on either side of the boundary come from
//! the same physical counter. Hosts without that counter fall back to a
//! process-local monotonic clock, which is only comparable within one
//! process.

use crate::{CounterFrequency, CounterSample, CounterSource};

/// Returns the current value of the virtual system counter.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn read_counter() -> CounterSample {
    let cntvct: u64;
    unsafe {
        // Leave off `nomem` so the read also acts as a compiler fence.
        core::arch::asm!(
            "mrs {}, cntvct_el0",
            out(reg) cntvct,
            options(nostack, preserves_flags),
        );
    }
    cntvct
}

/// Returns the current value of the virtual system counter.
///
/// CNTVCT is 64 bits wide but AArch32 only exposes it through a paired
/// `mrrc`, which transfers both halves of one consistent sample.
#[cfg(target_arch = "arm")]
#[inline(always)]
pub fn read_counter() -> CounterSample {
    let low: u32;
    let high: u32;
    unsafe {
        core::arch::asm!(
            "mrrc p15, 1, {low}, {high}, c14",
            low = out(reg) low,
            high = out(reg) high,
            options(nostack, preserves_flags),
        );
    }
    ((high as u64) << 32) | (low as u64)
}

/// Returns the current value of the physical system counter.
///
/// CNTVCT is CNTPCT minus CNTVOFF, and CNTVOFF is programmed by the
/// hypervisor per virtual machine. A normal world running under a hypervisor
/// that sets a non-zero offset therefore reads a virtual count the secure
/// world does not see, and a matching frequency and source cannot reveal
/// that. Reading CNTPCT from EL0 requires the kernel to set CNTKCTL.EL0PCTEN.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn read_physical_counter() -> CounterSample {
    let cntpct: u64;
    unsafe {
        core::arch::asm!(
            "mrs {}, cntpct_el0",
            out(reg) cntpct,
            options(nostack, preserves_flags),
        );
    }
    cntpct
}

/// Returns the current value of the physical system counter.
#[cfg(target_arch = "arm")]
#[inline(always)]
pub fn read_physical_counter() -> CounterSample {
    let low: u32;
    let high: u32;
    unsafe {
        core::arch::asm!(
            "mrrc p15, 0, {low}, {high}, c14",
            low = out(reg) low,
            high = out(reg) high,
            options(nostack, preserves_flags),
        );
    }
    ((high as u64) << 32) | (low as u64)
}

/// Returns the counter frequency in Hz.
#[cfg(target_arch = "aarch64")]
#[inline]
pub fn read_frequency() -> CounterFrequency {
    let cntfrq: u64;
    unsafe {
        core::arch::asm!(
            "mrs {}, cntfrq_el0",
            out(reg) cntfrq,
            options(nomem, nostack, preserves_flags),
        );
    }
    // Only the low 32 bits of CNTFRQ_EL0 are defined.
    cntfrq as u32
}

/// Returns the counter frequency in Hz.
#[cfg(target_arch = "arm")]
#[inline]
pub fn read_frequency() -> CounterFrequency {
    let cntfrq: u32;
    unsafe {
        core::arch::asm!(
            "mrc p15, 0, {}, c14, c0, 0",
            out(reg) cntfrq,
            options(nomem, nostack, preserves_flags),
        );
    }
    cntfrq
}

/// Which counter `read_counter` samples on this build.
#[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
pub const fn counter_source() -> CounterSource {
    CounterSource::ArmGenericTimer
}

#[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
mod fallback {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();

    pub(super) const FREQUENCY_HZ: u32 = 1_000_000_000;

    /// Nanoseconds since the first read in this process.
    pub(super) fn nanos_since_epoch() -> u64 {
        let nanos = EPOCH.get_or_init(Instant::now).elapsed().as_nanos();
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }
}

/// Returns a monotonic nanosecond count local to this process.
#[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
#[inline]
pub fn read_counter() -> CounterSample {
    fallback::nanos_since_epoch()
}

/// The fallback has no virtual offset, so this is `read_counter`.
#[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
#[inline]
pub fn read_physical_counter() -> CounterSample {
    fallback::nanos_since_epoch()
}

/// Returns the fallback counter frequency (1 GHz).
#[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
#[inline]
pub fn read_frequency() -> CounterFrequency {
    fallback::FREQUENCY_HZ
}

/// Which counter `read_counter` samples on this build.
#[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
pub const fn counter_source() -> CounterSource {
    CounterSource::HostMonotonic
}
