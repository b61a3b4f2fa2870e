// Licensed under the Apache-2.0 license

//! In-process TEE: hosts the latency trusted application behind the
//! [`TeeClient`] interface, with an emulated TEE core answering its property
//! queries.

use latency_messages::{ErrorOrigin, Failure, Params, TeeError, TeeResult};
use latency_ta::{
    LatencyTa, PropertyScope, SystemProperties, TimerDescriptor, TrustedApplication,
    TIMER_DESCRIPTOR_PROPERTY, TIMER_DESCRIPTOR_SIZE,
};
use log::{debug, trace};
use syscounter::SysCounter;
use uuid::Uuid;
use zerocopy::IntoBytes;

use crate::client::{LoginMethod, TeeClient};
use crate::config::LATENCY_TA_UUID;

/// Failures to inject into the emulated TEE.
#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    /// Returned (origin: client API) by `initialize_context`.
    pub initialize_context: Option<TeeError>,
    /// Returned (origin: TEE) by `open_session` before the TA is reached.
    pub open_session: Option<TeeError>,
    /// Returned by the TEE core for the TA's property query.
    pub property_query: Option<TeeError>,
}

/// Lifecycle calls observed by the loopback, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackEvent {
    InitializeContext,
    OpenSession,
    Invoke(u32),
    CloseSession,
    FinalizeContext,
}

/// The emulated TEE core. Samples its counter while servicing the query.
pub struct EmulatedCore<K> {
    counter: K,
    fault: Option<TeeError>,
}

impl<K: SysCounter> SystemProperties for EmulatedCore<K> {
    fn get_property_as_binary_block(
        &self,
        scope: PropertyScope,
        name: &str,
        out: &mut [u8],
    ) -> TeeResult<usize> {
        let received = self.counter.ticks();
        if let Some(err) = self.fault {
            return Err(err);
        }
        if scope != PropertyScope::TeeImplementation || name != TIMER_DESCRIPTOR_PROPERTY {
            return Err(TeeError::ItemNotFound);
        }
        let descriptor = TimerDescriptor {
            counter: received,
            frequency: self.counter.frequency(),
            reserved: 0,
        };
        let out = out
            .get_mut(..TIMER_DESCRIPTOR_SIZE)
            .ok_or(TeeError::ShortBuffer)?;
        out.copy_from_slice(descriptor.as_bytes());
        Ok(TIMER_DESCRIPTOR_SIZE)
    }
}

#[derive(Debug)]
pub struct LoopbackContext {
    id: u32,
}

#[derive(Debug)]
pub struct LoopbackSession {
    id: u32,
}

pub struct LoopbackClient<K> {
    ta: LatencyTa<K, EmulatedCore<K>>,
    uuid: Uuid,
    faults: Faults,
    next_id: u32,
    sessions: Vec<u32>,
    instance_alive: bool,
    events: Vec<LoopbackEvent>,
}

impl<K: SysCounter + Clone> LoopbackClient<K> {
    /// A loopback hosting the trusted application under [`LATENCY_TA_UUID`].
    pub fn new(counter: K) -> Self {
        Self::with_faults(counter, Faults::default())
    }

    pub fn with_faults(counter: K, faults: Faults) -> Self {
        let core = EmulatedCore {
            counter: counter.clone(),
            fault: faults.property_query,
        };
        Self {
            ta: LatencyTa::new(counter, core),
            uuid: LATENCY_TA_UUID,
            faults,
            next_id: 1,
            sessions: Vec::new(),
            instance_alive: false,
            events: Vec::new(),
        }
    }
}

impl<K> LoopbackClient<K> {
    pub fn events(&self) -> &[LoopbackEvent] {
        &self.events
    }

    /// Number of times `event` was observed.
    pub fn count(&self, event: LoopbackEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

fn from_ta(error: TeeError) -> Failure {
    Failure::new(error, ErrorOrigin::TrustedApp)
}

impl<K: SysCounter> TeeClient for LoopbackClient<K> {
    type Context = LoopbackContext;
    type Session = LoopbackSession;

    fn initialize_context(&mut self) -> Result<LoopbackContext, Failure> {
        self.events.push(LoopbackEvent::InitializeContext);
        if let Some(err) = self.faults.initialize_context {
            return Err(Failure::new(err, ErrorOrigin::Api));
        }
        Ok(LoopbackContext {
            id: self.allocate_id(),
        })
    }

    fn open_session(
        &mut self,
        context: &mut LoopbackContext,
        uuid: &Uuid,
        login: LoginMethod,
        params: &mut Params<'_>,
    ) -> Result<LoopbackSession, Failure> {
        self.events.push(LoopbackEvent::OpenSession);
        trace!("open_session ctx={} login={:?}", context.id, login);
        if let Some(err) = self.faults.open_session {
            return Err(Failure::new(err, ErrorOrigin::Tee));
        }
        if *uuid != self.uuid {
            return Err(Failure::new(TeeError::ItemNotFound, ErrorOrigin::Tee));
        }

        if !self.instance_alive {
            self.ta.create().map_err(from_ta)?;
            self.instance_alive = true;
        }
        if let Err(err) = self.ta.open_session(params) {
            if self.sessions.is_empty() {
                self.ta.destroy();
                self.instance_alive = false;
            }
            return Err(from_ta(err));
        }

        let id = self.allocate_id();
        self.sessions.push(id);
        debug!("Loopback session {} opened", id);
        Ok(LoopbackSession { id })
    }

    fn invoke(
        &mut self,
        session: &mut LoopbackSession,
        command_id: u32,
        params: &mut Params<'_>,
    ) -> Result<(), Failure> {
        self.events.push(LoopbackEvent::Invoke(command_id));
        if !self.sessions.contains(&session.id) {
            return Err(Failure::new(TeeError::BadState, ErrorOrigin::Api));
        }
        self.ta.invoke_command(command_id, params).map_err(from_ta)
    }

    fn close_session(&mut self, session: LoopbackSession) {
        self.events.push(LoopbackEvent::CloseSession);
        let before = self.sessions.len();
        self.sessions.retain(|id| *id != session.id);
        if self.sessions.len() == before {
            return;
        }
        self.ta.close_session();
        if self.sessions.is_empty() {
            self.ta.destroy();
            self.instance_alive = false;
        }
    }

    fn finalize_context(&mut self, _context: LoopbackContext) {
        self.events.push(LoopbackEvent::FinalizeContext);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latency_messages::{read_response, CounterInfo, EntrySample, OperationId, OutputSlots};
    use syscounter::ArchCounter;

    fn open(client: &mut LoopbackClient<ArchCounter>) -> (LoopbackContext, LoopbackSession) {
        let mut ctx = client.initialize_context().unwrap();
        let session = client
            .open_session(
                &mut ctx,
                &LATENCY_TA_UUID,
                LoginMethod::Public,
                &mut Params::none(),
            )
            .unwrap();
        (ctx, session)
    }

    #[test]
    fn test_invoke_reaches_trusted_application() {
        let mut client = LoopbackClient::new(ArchCounter::new());
        let (ctx, mut session) = open(&mut client);

        let mut slots = OutputSlots::for_response::<CounterInfo>();
        let mut params = slots.params();
        let id = u32::from(OperationId::QueryCounterInfo);
        client.invoke(&mut session, id, &mut params).unwrap();
        let info: CounterInfo = read_response(&params).unwrap();
        assert_eq!(info.frequency, ArchCounter::new().frequency());

        client.close_session(session);
        client.finalize_context(ctx);
        assert_eq!(
            client.events(),
            [
                LoopbackEvent::InitializeContext,
                LoopbackEvent::OpenSession,
                LoopbackEvent::Invoke(2),
                LoopbackEvent::CloseSession,
                LoopbackEvent::FinalizeContext,
            ]
        );
    }

    #[test]
    fn test_unknown_uuid() {
        let mut client = LoopbackClient::new(ArchCounter::new());
        let mut ctx = client.initialize_context().unwrap();
        let err = client
            .open_session(
                &mut ctx,
                &Uuid::nil(),
                LoginMethod::Public,
                &mut Params::none(),
            )
            .unwrap_err();
        assert_eq!(err, Failure::new(TeeError::ItemNotFound, ErrorOrigin::Tee));
    }

    #[test]
    fn test_ta_errors_carry_ta_origin() {
        let mut client = LoopbackClient::new(ArchCounter::new());
        let (_ctx, mut session) = open(&mut client);

        let mut slots = OutputSlots::for_response::<EntrySample>();
        let mut params = slots.params();
        let err = client.invoke(&mut session, 99, &mut params).unwrap_err();
        assert_eq!(err, from_ta(TeeError::NotImplemented));
    }

    #[test]
    fn test_property_fault_reaches_ta() {
        let faults = Faults {
            property_query: Some(TeeError::AccessDenied),
            ..Default::default()
        };
        let mut client = LoopbackClient::with_faults(ArchCounter::new(), faults);
        let (_ctx, mut session) = open(&mut client);

        let mut slots = OutputSlots::new(3);
        let mut params = slots.params();
        let id = u32::from(OperationId::MeasureSyscallTime);
        let err = client.invoke(&mut session, id, &mut params).unwrap_err();
        assert_eq!(err, from_ta(TeeError::AccessDenied));
    }

    #[test]
    fn test_closed_session_is_rejected() {
        let mut client = LoopbackClient::new(ArchCounter::new());
        let (_ctx, session) = open(&mut client);
        let mut stale = LoopbackSession { id: session.id };
        client.close_session(session);
        assert_eq!(
            client.invoke(&mut stale, 0, &mut Params::none()),
            Err(Failure::new(TeeError::BadState, ErrorOrigin::Api))
        );
        assert!(!client.instance_alive);
    }
}
