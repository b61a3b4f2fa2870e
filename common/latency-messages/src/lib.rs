// Licensed under the Apache-2.0 license

//! Messages exchanged across the normal-world / secure-world boundary.
//!
//! Both the client and the trusted application link this crate, so the
//! operation identifiers, parameter shapes and response layouts are defined
//! exactly once.

#![cfg_attr(target_os = "optee", no_std)]

pub mod buffer;
pub mod operation;
pub mod param;
pub mod result;

pub use buffer::{
    check_response_capacity, read_response, write_response, BufferError, OutputSlots, Response,
    SLOT_SIZE,
};
pub use operation::{
    CounterInfo, EntrySample, MeasureSyscallTime, Operation, OperationId, QueryCounterInfo,
    ReportTimestamp, SyscallSamples,
};
pub use param::{OutputBuffer, Param, ParamType, ParamTypes, Params, PARAM_COUNT};
pub use result::{ErrorOrigin, Failure, TeeError, TeeResult};
