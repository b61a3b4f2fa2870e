// Licensed under the Apache-2.0 license

use latency_messages::{Params, TeeResult};

/// Callbacks the secure-world dispatcher invokes on a trusted application.
///
/// The dispatcher serializes calls; implementors keep no per-session state,
/// so no session context is handed back from `open_session`.
pub trait TrustedApplication {
    /// Called once when the application instance is created.
    fn create(&self) -> TeeResult;

    /// Called when a client opens a session. Returning an error refuses the
    /// session.
    fn open_session(&self, params: &mut Params<'_>) -> TeeResult;

    /// Called for each command a client invokes on an open session.
    fn invoke_command(&self, command_id: u32, params: &mut Params<'_>) -> TeeResult;

    /// Called when a client closes its session.
    fn close_session(&self);

    /// Called once before the instance is torn down.
    fn destroy(&self);
}
