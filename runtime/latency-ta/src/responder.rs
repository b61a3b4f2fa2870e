// Licensed under the Apache-2.0 license

use latency_messages::{
    check_response_capacity, write_response, CounterInfo, EntrySample, Operation, ParamTypes,
    Params, Response, SyscallSamples, TeeError, TeeResult,
};
use log::{debug, trace, warn};
use syscounter::{SysCounter, TeeTime};

use crate::command::Command;
use crate::lifecycle::TrustedApplication;
use crate::properties::{
    PropertyScope, SystemProperties, TimerDescriptor, TIMER_DESCRIPTOR_PROPERTY,
    TIMER_DESCRIPTOR_SIZE,
};

/// The latency trusted application.
///
/// Holds only the counter and the system-call seam; every call is
/// independent of the ones before it.
pub struct LatencyTa<C, P> {
    counter: C,
    properties: P,
}

impl<C: SysCounter, P: SystemProperties> LatencyTa<C, P> {
    pub const fn new(counter: C, properties: P) -> Self {
        Self {
            counter,
            properties,
        }
    }

    fn now(&self, ticks: u64) -> TeeTime {
        TeeTime::from_ticks(ticks, self.counter.frequency())
    }

    /// Validate the parameter shape and capacities for operation `O`, run
    /// `produce`, and write its response. Nothing is written unless every
    /// check passes and `produce` succeeds.
    fn respond<O: Operation>(
        &self,
        _op: O,
        params: &mut Params<'_>,
        produce: impl FnOnce() -> TeeResult<O::Response>,
    ) -> TeeResult {
        expect_shape(params.types(), <O::Response as Response>::param_types())?;
        check_response_capacity::<O::Response>(params).map_err(|e| {
            warn!("{:?}: {}", O::ID, e);
            e.tee_error()
        })?;
        let response = produce()?;
        write_response(params, &response).map_err(|e| e.tee_error())
    }

    /// Sample the counter around one nested property query.
    fn measure_syscall(&self) -> TeeResult<SyscallSamples> {
        let mut blob = [0u8; TIMER_DESCRIPTOR_SIZE];
        let start = self.counter.ticks();
        let result = self.properties.get_property_as_binary_block(
            PropertyScope::TeeImplementation,
            TIMER_DESCRIPTOR_PROPERTY,
            &mut blob,
        );
        let returned = self.counter.ticks();

        let len = result.map_err(|e| {
            warn!("Property query failed: {}", e);
            e
        })?;
        let descriptor = TimerDescriptor::parse(blob.get(..len).ok_or(TeeError::BadFormat)?)?;
        trace!(
            "syscall start={} received={} return={}",
            start, descriptor.counter, returned
        );
        Ok(SyscallSamples {
            start,
            received: descriptor.counter,
            returned,
        })
    }
}

impl<C: SysCounter, P: SystemProperties> TrustedApplication for LatencyTa<C, P> {
    fn create(&self) -> TeeResult {
        let now = self.counter.ticks();
        debug!("[{}] has been called", self.now(now));
        Ok(())
    }

    fn open_session(&self, params: &mut Params<'_>) -> TeeResult {
        let entry = self.counter.ticks();
        let types = params.types();
        if types == ParamTypes::NONE {
            debug!("[{}] session opened", self.now(entry));
            return Ok(());
        }
        expect_shape(types, EntrySample::param_types())?;
        check_response_capacity::<EntrySample>(params).map_err(|e| e.tee_error())?;
        write_response(params, &EntrySample { counter: entry }).map_err(|e| e.tee_error())?;
        debug!("[{}] session opened, entry={}", self.now(entry), entry);
        Ok(())
    }

    fn invoke_command(&self, command_id: u32, params: &mut Params<'_>) -> TeeResult {
        let entry = self.counter.ticks();
        trace!("[{}] enter invoke command {}", self.now(entry), command_id);

        let command = Command::decode(command_id).map_err(|e| {
            warn!("Unknown command {}", command_id);
            e
        })?;
        let result = match command {
            Command::ReportTimestamp(op) => {
                self.respond(op, params, || Ok(EntrySample { counter: entry }))
            }
            Command::MeasureSyscallTime(op) => self.respond(op, params, || self.measure_syscall()),
            Command::QueryCounterInfo(op) => self.respond(op, params, || {
                Ok(CounterInfo::new(
                    self.counter.frequency(),
                    self.counter.source(),
                ))
            }),
        };

        let leave = self.counter.ticks();
        trace!("[{}] leave invoke command: {:?}", self.now(leave), result);
        result
    }

    fn close_session(&self) {
        debug!("session closed");
    }

    fn destroy(&self) {
        debug!("has been called");
    }
}

fn expect_shape(actual: ParamTypes, expected: ParamTypes) -> TeeResult {
    if actual != expected {
        warn!("Bad parameters: got {:?}, expected {:?}", actual, expected);
        return Err(TeeError::BadParameters);
    }
    Ok(())
}
