// Licensed under the Apache-2.0 license

//! Operations understood by the latency trusted application.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::buffer::Response;

/// Command identifiers for `invoke_command`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum OperationId {
    /// Return the trusted application's entry sample.
    ReportTimestamp = 0,
    /// Time a nested system call inside the trusted application.
    MeasureSyscallTime = 1,
    /// Describe the counter the trusted application reads.
    QueryCounterInfo = 2,
}

/// A typed operation: its identifier and the response it returns.
pub trait Operation {
    const ID: OperationId;
    type Response: Response;
}

/// Counter sampled on entry to the trusted application. Returned by the
/// timing variant of open-session and by `ReportTimestamp`.
#[repr(C)]
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, Immutable, KnownLayout,
)]
pub struct EntrySample {
    pub counter: u64,
}

impl Response for EntrySample {}

/// Samples taken by the trusted application around a nested system call.
#[repr(C)]
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, Immutable, KnownLayout,
)]
pub struct SyscallSamples {
    /// Taken just before the system call.
    pub start: u64,
    /// Taken by the TEE core while servicing the call.
    pub received: u64,
    /// Taken just after the call returned.
    pub returned: u64,
}

impl Response for SyscallSamples {}

/// Frequency and source of the trusted application's counter.
#[repr(C)]
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, Immutable, KnownLayout,
)]
pub struct CounterInfo {
    pub frequency: u32,
    /// Raw [`syscounter::CounterSource`].
    pub source: u32,
}

impl CounterInfo {
    pub fn new(frequency: u32, source: syscounter::CounterSource) -> Self {
        Self {
            frequency,
            source: source.into(),
        }
    }

    pub fn source(&self) -> Option<syscounter::CounterSource> {
        syscounter::CounterSource::from_raw(self.source)
    }
}

impl Response for CounterInfo {}

pub struct ReportTimestamp;

impl Operation for ReportTimestamp {
    const ID: OperationId = OperationId::ReportTimestamp;
    type Response = EntrySample;
}

pub struct MeasureSyscallTime;

impl Operation for MeasureSyscallTime {
    const ID: OperationId = OperationId::MeasureSyscallTime;
    type Response = SyscallSamples;
}

pub struct QueryCounterInfo;

impl Operation for QueryCounterInfo {
    const ID: OperationId = OperationId::QueryCounterInfo;
    type Response = CounterInfo;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SLOT_SIZE;

    #[test]
    fn test_operation_ids() {
        let ids = [
            OperationId::ReportTimestamp,
            OperationId::MeasureSyscallTime,
            OperationId::QueryCounterInfo,
        ];
        for (raw, id) in (0u32..).zip(ids) {
            assert_eq!(OperationId::try_from(raw).unwrap(), id);
        }
        assert!(OperationId::try_from(3u32).is_err());
        assert_eq!(u32::from(MeasureSyscallTime::ID), 1);
    }

    #[test]
    fn test_response_layouts() {
        assert_eq!(core::mem::size_of::<EntrySample>(), SLOT_SIZE);
        assert_eq!(core::mem::size_of::<SyscallSamples>(), 3 * SLOT_SIZE);
        assert_eq!(core::mem::size_of::<CounterInfo>(), SLOT_SIZE);
    }

    #[test]
    fn test_counter_info_source() {
        use syscounter::CounterSource;

        let info = CounterInfo::new(19_200_000, CounterSource::ArmGenericTimer);
        assert_eq!(info.source(), Some(CounterSource::ArmGenericTimer));
        let bogus = CounterInfo {
            frequency: 1,
            source: 77,
        };
        assert_eq!(bogus.source(), None);
    }
}
