// Licensed under the Apache-2.0 license

//! OP-TEE entry points.
//!
//! The TA image links libutee and the dev-kit generated TA header; this
//! module only provides the five lifecycle symbols and the property query.

use core::ffi::{c_char, c_void};

use latency_messages::{
    OutputBuffer, Param, ParamType, ParamTypes, Params, TeeError, TeeResult, PARAM_COUNT,
};
use syscounter::ArchCounter;

use crate::lifecycle::TrustedApplication;
use crate::properties::{PropertyScope, SystemProperties};
use crate::responder::LatencyTa;

const TEE_SUCCESS: u32 = 0;
const MAX_PROPERTY_NAME: usize = 64;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct TeeMemref {
    buffer: *mut c_void,
    size: usize,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct TeeValue {
    a: u32,
    b: u32,
}

#[repr(C)]
pub union TeeParam {
    memref: TeeMemref,
    value: TeeValue,
}

extern "C" {
    fn TEE_GetPropertyAsBinaryBlock(
        propset_or_enumerator: *mut c_void,
        name: *const c_char,
        value_buffer: *mut c_void,
        value_buffer_len: *mut usize,
    ) -> u32;

    #[cfg(target_os = "optee")]
    fn TEE_Panic(panic_code: u32) -> !;
}

/// `TEE_GetPropertyAsBinaryBlock` from libutee.
struct UteeProperties;

impl SystemProperties for UteeProperties {
    fn get_property_as_binary_block(
        &self,
        scope: PropertyScope,
        name: &str,
        out: &mut [u8],
    ) -> TeeResult<usize> {
        let mut c_name = [0u8; MAX_PROPERTY_NAME];
        if name.len() >= c_name.len() {
            return Err(TeeError::BadParameters);
        }
        c_name[..name.len()].copy_from_slice(name.as_bytes());

        let mut len = out.len();
        let status = unsafe {
            TEE_GetPropertyAsBinaryBlock(
                scope.handle() as usize as *mut c_void,
                c_name.as_ptr() as *const c_char,
                out.as_mut_ptr() as *mut c_void,
                &mut len,
            )
        };
        match TeeError::from_raw(status) {
            None => Ok(len),
            Some(err) => Err(err),
        }
    }
}

static TA: LatencyTa<ArchCounter, UteeProperties> =
    LatencyTa::new(ArchCounter::new(), UteeProperties);

fn status(result: TeeResult) -> u32 {
    match result {
        Ok(()) => TEE_SUCCESS,
        Err(err) => err.code(),
    }
}

/// Run `f` over typed views of the raw parameter array, then copy the output
/// sizes back.
///
/// # Safety
///
/// `raw` must point to `PARAM_COUNT` parameters whose memrefs are valid for
/// their declared sizes, as guaranteed by the TEE core.
unsafe fn with_params(
    param_types: u32,
    raw: *mut TeeParam,
    f: impl FnOnce(&mut Params<'_>) -> TeeResult,
) -> TeeResult {
    let types = ParamTypes::from_raw(param_types);
    if types == ParamTypes::NONE {
        return f(&mut Params::none());
    }
    if raw.is_null() {
        return Err(TeeError::BadParameters);
    }
    let raw = core::slice::from_raw_parts_mut(raw, PARAM_COUNT);

    let mut params = Params::none();
    for (index, slot) in raw.iter().enumerate() {
        params[index] = match types.get(index) {
            Some(ParamType::None) => Param::None,
            Some(ParamType::MemrefInput) => {
                let memref = slot.memref;
                Param::MemrefInput(if memref.buffer.is_null() {
                    &[]
                } else {
                    core::slice::from_raw_parts(memref.buffer as *const u8, memref.size)
                })
            }
            Some(ParamType::MemrefOutput) => {
                let memref = slot.memref;
                Param::MemrefOutput(OutputBuffer::new(if memref.buffer.is_null() {
                    &mut []
                } else {
                    core::slice::from_raw_parts_mut(memref.buffer as *mut u8, memref.size)
                }))
            }
            // Value and in/out parameters are never part of this protocol.
            _ => return Err(TeeError::BadParameters),
        };
    }

    let result = f(&mut params);

    let mut sizes = [None; PARAM_COUNT];
    for (index, param) in params.iter().enumerate() {
        if let Param::MemrefOutput(out) = param {
            sizes[index] = Some(out.size());
        }
    }
    drop(params);
    for (slot, size) in raw.iter_mut().zip(sizes) {
        if let Some(size) = size {
            slot.memref.size = size;
        }
    }
    result
}

#[no_mangle]
pub extern "C" fn TA_CreateEntryPoint() -> u32 {
    status(TA.create())
}

#[no_mangle]
pub extern "C" fn TA_DestroyEntryPoint() {
    TA.destroy()
}

/// # Safety
///
/// Called by libutee with a valid parameter array.
#[no_mangle]
pub unsafe extern "C" fn TA_OpenSessionEntryPoint(
    param_types: u32,
    params: *mut TeeParam,
    _session_context: *mut *mut c_void,
) -> u32 {
    status(with_params(param_types, params, |p| TA.open_session(p)))
}

#[no_mangle]
pub extern "C" fn TA_CloseSessionEntryPoint(_session_context: *mut c_void) {
    TA.close_session()
}

/// # Safety
///
/// Called by libutee with a valid parameter array.
#[no_mangle]
pub unsafe extern "C" fn TA_InvokeCommandEntryPoint(
    _session_context: *mut c_void,
    command_id: u32,
    param_types: u32,
    params: *mut TeeParam,
) -> u32 {
    status(with_params(param_types, params, |p| {
        TA.invoke_command(command_id, p)
    }))
}

#[cfg(target_os = "optee")]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { TEE_Panic(TeeError::Generic.code()) }
}
