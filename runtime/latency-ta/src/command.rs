// Licensed under the Apache-2.0 license

use latency_messages::{
    MeasureSyscallTime, OperationId, QueryCounterInfo, ReportTimestamp, TeeError, TeeResult,
};

/// A decoded command identifier. Each variant carries the typed operation
/// that fixes its response layout.
pub enum Command {
    ReportTimestamp(ReportTimestamp),
    MeasureSyscallTime(MeasureSyscallTime),
    QueryCounterInfo(QueryCounterInfo),
}

impl Command {
    /// Decode a raw command identifier. Unknown identifiers are
    /// `NotImplemented`.
    pub fn decode(command_id: u32) -> TeeResult<Self> {
        let id = OperationId::try_from(command_id).map_err(|_| TeeError::NotImplemented)?;
        Ok(match id {
            OperationId::ReportTimestamp => Command::ReportTimestamp(ReportTimestamp),
            OperationId::MeasureSyscallTime => Command::MeasureSyscallTime(MeasureSyscallTime),
            OperationId::QueryCounterInfo => Command::QueryCounterInfo(QueryCounterInfo),
        })
    }

    pub fn id(&self) -> OperationId {
        match self {
            Command::ReportTimestamp(_) => OperationId::ReportTimestamp,
            Command::MeasureSyscallTime(_) => OperationId::MeasureSyscallTime,
            Command::QueryCounterInfo(_) => OperationId::QueryCounterInfo,
        }
    }
}
