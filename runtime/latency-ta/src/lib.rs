/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Latency trusted application: samples the system counter on entry to
    each call from the normal world and around a nested system call, and
    returns the samples through the caller's output buffers.
--*/

#![cfg_attr(target_os = "optee", no_std)]

mod command;
#[cfg(feature = "optee")]
mod entry;
mod lifecycle;
mod properties;
mod responder;

pub use command::Command;
pub use lifecycle::TrustedApplication;
pub use properties::{
    PropertyScope, SystemProperties, TimerDescriptor, TIMER_DESCRIPTOR_PROPERTY,
    TIMER_DESCRIPTOR_SIZE,
};
pub use responder::LatencyTa;
