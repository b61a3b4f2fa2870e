// Licensed under the Apache-2.0 license

use latency_messages::{
    read_response, EntrySample, MeasureSyscallTime, Operation, OutputSlots, Params,
    QueryCounterInfo, ReportTimestamp, Response,
};
use std::fmt::Display;

use log::{debug, info, log_enabled, warn, Level};
use syscounter::{SysCounter, TeeTime};

use crate::client::{Connection, TeeClient};
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::report::Report;
use crate::scenario::{ClockCheck, ClockSync, CounterDomain, Scenario, ScenarioResult};

/// Run the selected scenarios against the trusted application and collect
/// their samples.
///
/// Scenarios run in a fixed order: session open, command invocation, then
/// the nested system call. The session is closed and the context finalized
/// on every exit path.
pub fn measure_performance<C: TeeClient, K: SysCounter>(
    client: &mut C,
    counter: &K,
    config: &ProbeConfig,
) -> Result<Report, ProbeError> {
    let frequency = counter.frequency();
    if frequency == 0 {
        return Err(ProbeError::ZeroFrequency);
    }

    progress(counter, "Initializing context");
    let mut conn = Connection::initialize(client)?;

    let uuid = &config.ta_uuid;
    progress(counter, format_args!("Opening session to {}", uuid));
    let open_samples = if config.runs(Scenario::OpenSession) {
        let mut slots = OutputSlots::for_response::<EntrySample>();
        let mut params = slots.params();
        let start = counter.ticks();
        let opened = conn.open_session(uuid, &mut params);
        let end = counter.ticks();
        opened.map_err(ProbeError::open_session)?;
        let entry: EntrySample = decode("TEEC_OpenSession", &params)?;
        Some((start, entry.counter, end))
    } else {
        conn.open_session(uuid, &mut Params::none())
            .map_err(ProbeError::open_session)?;
        None
    };

    let remote = invoke(&mut conn, QueryCounterInfo)?;
    let clock = ClockCheck::compare(
        CounterDomain::new(frequency, counter.source()),
        CounterDomain::from(remote),
    );
    match clock.sync {
        ClockSync::Shared => debug!(
            "Counters shared: {:?} at {} Hz",
            clock.local.source, frequency
        ),
        ClockSync::Unsynchronized => {
            let (ours, theirs) = (&clock.local, &clock.remote);
            warn!(
                "Unsynchronized clocks, one-way comparison invalid: local {:?} at {} Hz, \
                 trusted application {:?} at {} Hz",
                ours.source, ours.frequency, theirs.source, theirs.frequency
            );
        }
    }

    let mut scenarios = Vec::new();
    if let Some((start, entry, end)) = open_samples {
        scenarios.push(ScenarioResult::crossing(
            Scenario::OpenSession,
            &clock,
            start,
            entry,
            end,
        )?);
    }

    if config.runs(Scenario::InvokeCommand) {
        progress(counter, "Invoking command");
        let mut slots = OutputSlots::for_response::<EntrySample>();
        let mut params = slots.params();
        let start = counter.ticks();
        let invoked = conn.invoke(ReportTimestamp::ID.into(), &mut params);
        let end = counter.ticks();
        invoked.map_err(|failure| ProbeError::invoke(ReportTimestamp::ID, failure))?;
        let entry: EntrySample = decode("TEEC_InvokeCommand", &params)?;
        scenarios.push(ScenarioResult::crossing(
            Scenario::InvokeCommand,
            &clock,
            start,
            entry.counter,
            end,
        )?);
    }

    if config.runs(Scenario::NestedSyscall) {
        progress(counter, "Measuring nested system call");
        let samples = invoke(&mut conn, MeasureSyscallTime)?;
        scenarios.push(ScenarioResult::nested(&clock, samples)?);
    }

    progress(counter, "Closing session");
    conn.close();

    Ok(Report { clock, scenarios })
}

/// Log a step prefixed with the current counter time. The counter is only
/// read when the message will be emitted.
fn progress<K: SysCounter>(counter: &K, step: impl Display) {
    if log_enabled!(Level::Info) {
        info!(
            "[{}] {}",
            TeeTime::from_ticks(counter.ticks(), counter.frequency()),
            step
        );
    }
}

/// Invoke `O` untimed and decode its response.
fn invoke<C: TeeClient, O: Operation>(
    conn: &mut Connection<'_, C>,
    _op: O,
) -> Result<O::Response, ProbeError> {
    let mut slots = OutputSlots::for_response::<O::Response>();
    let mut params = slots.params();
    conn.invoke(O::ID.into(), &mut params)
        .map_err(|failure| ProbeError::invoke(O::ID, failure))?;
    decode("TEEC_InvokeCommand", &params)
}

fn decode<R: Response>(call: &'static str, params: &Params<'_>) -> Result<R, ProbeError> {
    read_response(params).map_err(|error| ProbeError::MalformedResponse { call, error })
}
