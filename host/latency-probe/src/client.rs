// Licensed under the Apache-2.0 license

//! Client side of the TEE connection.

use latency_messages::{ErrorOrigin, Failure, Params, TeeError};
use log::debug;
use uuid::Uuid;

use crate::error::ProbeError;

/// Login method presented when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    Public,
}

impl LoginMethod {
    pub fn raw(self) -> u32 {
        match self {
            LoginMethod::Public => 0,
        }
    }
}

/// A TEE client library: context and session lifecycle plus command
/// invocation. Every failing call reports its status and origin.
pub trait TeeClient {
    type Context;
    type Session;

    fn initialize_context(&mut self) -> Result<Self::Context, Failure>;

    /// Open a session to the trusted application `uuid`. `params` are passed
    /// to the trusted application's open-session entry point.
    fn open_session(
        &mut self,
        context: &mut Self::Context,
        uuid: &Uuid,
        login: LoginMethod,
        params: &mut Params<'_>,
    ) -> Result<Self::Session, Failure>;

    fn invoke(
        &mut self,
        session: &mut Self::Session,
        command_id: u32,
        params: &mut Params<'_>,
    ) -> Result<(), Failure>;

    fn close_session(&mut self, session: Self::Session);

    fn finalize_context(&mut self, context: Self::Context);
}

/// An initialized context and, once opened, a session on it.
///
/// Dropping the connection closes the session and then finalizes the
/// context, each at most once, whether the run succeeded or not.
pub struct Connection<'c, C: TeeClient> {
    client: &'c mut C,
    context: Option<C::Context>,
    session: Option<C::Session>,
}

impl<'c, C: TeeClient> Connection<'c, C> {
    pub fn initialize(client: &'c mut C) -> Result<Self, ProbeError> {
        let context = client
            .initialize_context()
            .map_err(|failure| ProbeError::Environment {
                call: "TEEC_InitializeContext",
                failure,
            })?;
        debug!("Context initialized");
        Ok(Self {
            client,
            context: Some(context),
            session: None,
        })
    }

    /// Open the session. The caller brackets this call when timing it.
    pub fn open_session(&mut self, uuid: &Uuid, params: &mut Params<'_>) -> Result<(), Failure> {
        let Some(context) = self.context.as_mut() else {
            return Err(Failure::new(TeeError::BadState, ErrorOrigin::Api));
        };
        let session = self
            .client
            .open_session(context, uuid, LoginMethod::Public, params)?;
        self.session = Some(session);
        debug!("Session opened to {}", uuid);
        Ok(())
    }

    pub fn invoke(&mut self, command_id: u32, params: &mut Params<'_>) -> Result<(), Failure> {
        match self.session.as_mut() {
            Some(session) => self.client.invoke(session, command_id, params),
            None => Err(Failure::new(TeeError::BadState, ErrorOrigin::Api)),
        }
    }

    /// Tear down explicitly.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            self.client.close_session(session);
            debug!("Session closed");
        }
        if let Some(context) = self.context.take() {
            self.client.finalize_context(context);
            debug!("Context finalized");
        }
    }
}

impl<C: TeeClient> Drop for Connection<'_, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
