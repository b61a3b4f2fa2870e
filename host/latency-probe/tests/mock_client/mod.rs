// Licensed under the Apache-2.0 license

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use latency_messages::{
    write_response, CounterInfo, EntrySample, ErrorOrigin, Failure, OperationId, Param, ParamTypes,
    Params, Response, SyscallSamples, TeeError,
};
use latency_probe::{LoginMethod, TeeClient};
use syscounter::{CounterSource, SysCounter};
use uuid::Uuid;

/// Local counter returning queued values, then repeating the last one.
pub struct ScriptedCounter {
    ticks: RefCell<VecDeque<u64>>,
    last: Cell<u64>,
    frequency: u32,
    source: CounterSource,
}

impl ScriptedCounter {
    pub fn new(ticks: &[u64], frequency: u32) -> Self {
        Self {
            ticks: RefCell::new(ticks.iter().copied().collect()),
            last: Cell::new(0),
            frequency,
            source: CounterSource::ArmGenericTimer,
        }
    }

    pub fn remaining(&self) -> usize {
        self.ticks.borrow().len()
    }
}

impl SysCounter for ScriptedCounter {
    fn ticks(&self) -> u64 {
        if let Some(t) = self.ticks.borrow_mut().pop_front() {
            self.last.set(t);
        }
        self.last.get()
    }

    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn source(&self) -> CounterSource {
        self.source
    }
}

/// A TEE client answering with canned responses and counting lifecycle calls.
pub struct MockClient {
    pub fail_init: Option<Failure>,
    pub fail_open: Option<Failure>,
    pub open_entry: u64,
    pub report_entry: u64,
    pub counter_info: CounterInfo,
    pub syscall: Result<SyscallSamples, Failure>,
    /// Commands answered with `NotImplemented`.
    pub unsupported: Vec<OperationId>,
    /// Command whose first output buffer reports a 4-byte size.
    pub truncate: Option<OperationId>,

    pub inits: u32,
    pub opens: u32,
    pub closes: u32,
    pub finalizes: u32,
    pub commands: Vec<u32>,
}

impl MockClient {
    pub fn new(frequency: u32) -> Self {
        Self {
            fail_init: None,
            fail_open: None,
            open_entry: 0,
            report_entry: 0,
            counter_info: CounterInfo::new(frequency, CounterSource::ArmGenericTimer),
            syscall: Ok(SyscallSamples::default()),
            unsupported: Vec::new(),
            truncate: None,
            inits: 0,
            opens: 0,
            closes: 0,
            finalizes: 0,
            commands: Vec::new(),
        }
    }
}

fn ta_failure(error: TeeError) -> Failure {
    Failure::new(error, ErrorOrigin::TrustedApp)
}

fn reply<R: Response>(params: &mut Params<'_>, response: &R) -> Result<(), Failure> {
    write_response(params, response).map_err(|e| ta_failure(e.tee_error()))
}

impl TeeClient for MockClient {
    type Context = ();
    type Session = ();

    fn initialize_context(&mut self) -> Result<(), Failure> {
        self.inits += 1;
        match self.fail_init {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn open_session(
        &mut self,
        _context: &mut (),
        _uuid: &Uuid,
        _login: LoginMethod,
        params: &mut Params<'_>,
    ) -> Result<(), Failure> {
        if let Some(failure) = self.fail_open {
            return Err(failure);
        }
        if params.types() != ParamTypes::NONE {
            reply(
                params,
                &EntrySample {
                    counter: self.open_entry,
                },
            )?;
        }
        self.opens += 1;
        Ok(())
    }

    fn invoke(
        &mut self,
        _session: &mut (),
        command_id: u32,
        params: &mut Params<'_>,
    ) -> Result<(), Failure> {
        self.commands.push(command_id);
        let operation = OperationId::try_from(command_id)
            .map_err(|_| ta_failure(TeeError::NotImplemented))?;
        if self.unsupported.contains(&operation) {
            return Err(ta_failure(TeeError::NotImplemented));
        }
        match operation {
            OperationId::ReportTimestamp => reply(
                params,
                &EntrySample {
                    counter: self.report_entry,
                },
            )?,
            OperationId::QueryCounterInfo => reply(params, &self.counter_info)?,
            OperationId::MeasureSyscallTime => reply(params, &self.syscall?)?,
        }
        if self.truncate == Some(operation) {
            if let Param::MemrefOutput(out) = &mut params[0] {
                out.set_size(4);
            }
        }
        Ok(())
    }

    fn close_session(&mut self, _session: ()) {
        self.closes += 1;
    }

    fn finalize_context(&mut self, _context: ()) {
        self.finalizes += 1;
    }
}
