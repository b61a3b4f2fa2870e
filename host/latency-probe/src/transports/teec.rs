// Licensed under the Apache-2.0 license

//! GlobalPlatform TEE client API (libteec).

use core::ffi::{c_char, c_void};
use std::ptr;

use latency_messages::{ErrorOrigin, Failure, Param, Params, TeeError, PARAM_COUNT};
use uuid::Uuid;

use crate::client::{LoginMethod, TeeClient};

/// Opaque storage for `TEEC_Context`, larger than any libteec layout.
#[repr(C, align(8))]
pub struct TeecContext {
    imp: [u8; 64],
}

/// Opaque storage for `TEEC_Session`. Keeps a pointer to its context, so
/// both live in boxes that never move.
#[repr(C, align(8))]
pub struct TeecSession {
    imp: [u8; 64],
}

#[repr(C)]
struct TeecUuid {
    time_low: u32,
    time_mid: u16,
    time_hi_and_version: u16,
    clock_seq_and_node: [u8; 8],
}

impl From<&Uuid> for TeecUuid {
    fn from(uuid: &Uuid) -> Self {
        let (time_low, time_mid, time_hi_and_version, clock_seq_and_node) = uuid.as_fields();
        Self {
            time_low,
            time_mid,
            time_hi_and_version,
            clock_seq_and_node: *clock_seq_and_node,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct TeecTempMemoryReference {
    buffer: *mut c_void,
    size: usize,
}

// Never passed, but sets the size of `TeecParameter`.
#[allow(dead_code)]
#[repr(C)]
#[derive(Clone, Copy)]
struct TeecRegisteredMemoryReference {
    parent: *mut c_void,
    size: usize,
    offset: usize,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct TeecValue {
    a: u32,
    b: u32,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Clone, Copy)]
union TeecParameter {
    tmpref: TeecTempMemoryReference,
    memref: TeecRegisteredMemoryReference,
    value: TeecValue,
}

#[repr(C)]
struct TeecOperation {
    started: u32,
    param_types: u32,
    params: [TeecParameter; PARAM_COUNT],
    session: *mut TeecSession,
}

#[link(name = "teec")]
extern "C" {
    fn TEEC_InitializeContext(name: *const c_char, context: *mut TeecContext) -> u32;

    fn TEEC_FinalizeContext(context: *mut TeecContext);

    fn TEEC_OpenSession(
        context: *mut TeecContext,
        session: *mut TeecSession,
        destination: *const TeecUuid,
        connection_method: u32,
        connection_data: *const c_void,
        operation: *mut TeecOperation,
        return_origin: *mut u32,
    ) -> u32;

    fn TEEC_CloseSession(session: *mut TeecSession);

    fn TEEC_InvokeCommand(
        session: *mut TeecSession,
        command_id: u32,
        operation: *mut TeecOperation,
        return_origin: *mut u32,
    ) -> u32;
}

fn check(status: u32, origin: u32) -> Result<(), Failure> {
    match TeeError::from_raw(status) {
        None => Ok(()),
        Some(error) => Err(Failure::new(error, ErrorOrigin::from_raw(origin))),
    }
}

/// Build a temporary-memref operation over `params`.
///
/// The operation borrows the parameter buffers through raw pointers and must
/// not outlive them.
fn operation(params: &mut Params<'_>) -> TeecOperation {
    let empty = TeecParameter {
        value: TeecValue { a: 0, b: 0 },
    };
    let mut op = TeecOperation {
        started: 0,
        param_types: params.types().raw(),
        params: [empty; PARAM_COUNT],
        session: ptr::null_mut(),
    };
    for (slot, param) in op.params.iter_mut().zip(params.iter_mut()) {
        match param {
            Param::None => {}
            Param::MemrefInput(data) => {
                slot.tmpref = TeecTempMemoryReference {
                    buffer: data.as_ptr() as *mut c_void,
                    size: data.len(),
                };
            }
            Param::MemrefOutput(out) => {
                slot.tmpref = TeecTempMemoryReference {
                    buffer: out.buffer_mut().as_mut_ptr() as *mut c_void,
                    size: out.capacity(),
                };
            }
        }
    }
    op
}

/// Copy the sizes reported for output memrefs back into `params`.
fn complete(op: &TeecOperation, params: &mut Params<'_>) {
    for (slot, param) in op.params.iter().zip(params.iter_mut()) {
        if let Param::MemrefOutput(out) = param {
            // SAFETY: `operation` wrote every output slot as a tmpref.
            out.set_size(unsafe { slot.tmpref.size });
        }
    }
}

/// Client backed by the system libteec.
#[derive(Debug, Default)]
pub struct TeecClient;

impl TeecClient {
    pub fn new() -> Self {
        Self
    }
}

impl TeeClient for TeecClient {
    type Context = Box<TeecContext>;
    type Session = Box<TeecSession>;

    fn initialize_context(&mut self) -> Result<Self::Context, Failure> {
        let mut context = Box::new(TeecContext { imp: [0; 64] });
        // SAFETY: `context` is writable storage at least as large as
        // TEEC_Context.
        let status = unsafe { TEEC_InitializeContext(ptr::null(), context.as_mut()) };
        check(status, ErrorOrigin::Api.raw())?;
        Ok(context)
    }

    fn open_session(
        &mut self,
        context: &mut Self::Context,
        uuid: &Uuid,
        login: LoginMethod,
        params: &mut Params<'_>,
    ) -> Result<Self::Session, Failure> {
        let mut session = Box::new(TeecSession { imp: [0; 64] });
        let destination = TeecUuid::from(uuid);
        let mut op = operation(params);
        let mut origin = 0;
        // SAFETY: the context was initialized by `initialize_context`, and
        // `op` only points into `params` which outlives the call.
        let status = unsafe {
            TEEC_OpenSession(
                context.as_mut(),
                session.as_mut(),
                &destination,
                login.raw(),
                ptr::null(),
                &mut op,
                &mut origin,
            )
        };
        complete(&op, params);
        check(status, origin)?;
        Ok(session)
    }

    fn invoke(
        &mut self,
        session: &mut Self::Session,
        command_id: u32,
        params: &mut Params<'_>,
    ) -> Result<(), Failure> {
        let mut op = operation(params);
        let mut origin = 0;
        // SAFETY: the session is open and `op` points into `params`.
        let status =
            unsafe { TEEC_InvokeCommand(session.as_mut(), command_id, &mut op, &mut origin) };
        complete(&op, params);
        check(status, origin)
    }

    fn close_session(&mut self, mut session: Self::Session) {
        // SAFETY: the session was opened by `open_session` and is closed once.
        unsafe { TEEC_CloseSession(session.as_mut()) }
    }

    fn finalize_context(&mut self, mut context: Self::Context) {
        // SAFETY: every session on the context has been closed.
        unsafe { TEEC_FinalizeContext(context.as_mut()) }
    }
}
