// Licensed under the Apache-2.0 license

//! Exact-size output contracts.
//!
//! Every response is a fixed layout split into 8-byte slots, one per output
//! buffer. The trusted side writes slot `i` into parameter `i` and sets that
//! parameter's size to [`SLOT_SIZE`]; the client rejects any other size.

use core::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::param::{OutputBuffer, Param, ParamType, ParamTypes, Params, PARAM_COUNT};
use crate::result::TeeError;

/// Bytes carried by one output buffer (one counter sample).
pub const SLOT_SIZE: usize = core::mem::size_of::<u64>();

/// A response layout that travels in consecutive output buffers.
pub trait Response: FromBytes + IntoBytes + Immutable + KnownLayout + Sized {
    /// Number of output buffers the response occupies.
    const SLOTS: usize = core::mem::size_of::<Self>() / SLOT_SIZE;

    /// Parameter shape a call carrying this response must have.
    fn param_types() -> ParamTypes {
        ParamTypes::outputs(Self::SLOTS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Slot `index` is not of the expected type.
    UnexpectedParam {
        index: usize,
        expected: ParamType,
        actual: ParamType,
    },
    /// Slot `index` cannot hold a full slot.
    Short {
        index: usize,
        capacity: usize,
        required: usize,
    },
    /// The callee reported a size other than [`SLOT_SIZE`] for slot `index`.
    SizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

impl BufferError {
    /// Status a trusted application reports for this error.
    pub fn tee_error(&self) -> TeeError {
        match self {
            BufferError::UnexpectedParam { .. } => TeeError::BadParameters,
            BufferError::Short { .. } => TeeError::ShortBuffer,
            BufferError::SizeMismatch { .. } => TeeError::BadFormat,
        }
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::UnexpectedParam {
                index,
                expected,
                actual,
            } => write!(
                f,
                "parameter {} is {:?}, expected {:?}",
                index, actual, expected
            ),
            BufferError::Short {
                index,
                capacity,
                required,
            } => write!(
                f,
                "output buffer {} holds {} bytes, {} required",
                index, capacity, required
            ),
            BufferError::SizeMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "output buffer {} returned {} bytes, expected {}",
                index, actual, expected
            ),
        }
    }
}

/// Caller-side storage for the output buffers of one call.
pub struct OutputSlots {
    storage: [[u8; SLOT_SIZE]; PARAM_COUNT],
    count: usize,
}

impl OutputSlots {
    /// Storage for `count` output buffers (at most four).
    pub fn new(count: usize) -> Self {
        Self {
            storage: [[0u8; SLOT_SIZE]; PARAM_COUNT],
            count: count.min(PARAM_COUNT),
        }
    }

    /// Storage sized for response `R`.
    pub fn for_response<R: Response>() -> Self {
        Self::new(R::SLOTS)
    }

    /// Parameters pointing at fresh, zeroed buffers. The buffers are never
    /// read back as input: every call starts from zero.
    pub fn params(&mut self) -> Params<'_> {
        let mut params = Params::none();
        for (index, slot) in self.storage.iter_mut().enumerate().take(self.count) {
            slot.fill(0);
            params[index] = Param::MemrefOutput(OutputBuffer::new(slot));
        }
        params
    }
}

/// Decode response `R` from the output buffers of a completed call.
pub fn read_response<R: Response>(params: &Params<'_>) -> Result<R, BufferError> {
    let mut response = R::new_zeroed();
    for (index, chunk) in response
        .as_mut_bytes()
        .chunks_exact_mut(SLOT_SIZE)
        .enumerate()
    {
        let out = expect_output(&params[index], index)?;
        if out.size() != SLOT_SIZE {
            return Err(BufferError::SizeMismatch {
                index,
                expected: SLOT_SIZE,
                actual: out.size(),
            });
        }
        if out.capacity() < SLOT_SIZE {
            return Err(BufferError::Short {
                index,
                capacity: out.capacity(),
                required: SLOT_SIZE,
            });
        }
        chunk.copy_from_slice(out.data());
    }
    Ok(response)
}

/// Check that the first `R::SLOTS` parameters are output buffers able to hold
/// one slot each, without writing anything.
///
/// A short buffer has its size set to [`SLOT_SIZE`] so the caller learns the
/// required capacity.
pub fn check_response_capacity<R: Response>(params: &mut Params<'_>) -> Result<(), BufferError> {
    for index in 0..R::SLOTS {
        let out = expect_output_mut(&mut params[index], index)?;
        if out.capacity() < SLOT_SIZE {
            out.set_size(SLOT_SIZE);
            return Err(BufferError::Short {
                index,
                capacity: out.capacity(),
                required: SLOT_SIZE,
            });
        }
    }
    Ok(())
}

/// Write `response` into the output buffers, one slot per buffer.
///
/// Every buffer is checked before any is written, so on error no output
/// bytes have been touched. Each buffer's size is set independently.
pub fn write_response<R: Response>(
    params: &mut Params<'_>,
    response: &R,
) -> Result<(), BufferError> {
    check_response_capacity::<R>(params)?;
    for (index, chunk) in response.as_bytes().chunks_exact(SLOT_SIZE).enumerate() {
        let out = expect_output_mut(&mut params[index], index)?;
        out.buffer_mut()[..SLOT_SIZE].copy_from_slice(chunk);
        out.set_size(SLOT_SIZE);
    }
    Ok(())
}

fn expect_output<'p, 'a>(
    param: &'p Param<'a>,
    index: usize,
) -> Result<&'p OutputBuffer<'a>, BufferError> {
    match param {
        Param::MemrefOutput(out) => Ok(out),
        other => Err(BufferError::UnexpectedParam {
            index,
            expected: ParamType::MemrefOutput,
            actual: other.param_type(),
        }),
    }
}

fn expect_output_mut<'p, 'a>(
    param: &'p mut Param<'a>,
    index: usize,
) -> Result<&'p mut OutputBuffer<'a>, BufferError> {
    match param {
        Param::MemrefOutput(out) => Ok(out),
        other => Err(BufferError::UnexpectedParam {
            index,
            expected: ParamType::MemrefOutput,
            actual: other.param_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{EntrySample, SyscallSamples};

    #[test]
    fn test_slots_per_response() {
        assert_eq!(EntrySample::SLOTS, 1);
        assert_eq!(SyscallSamples::SLOTS, 3);
        assert_eq!(SyscallSamples::param_types().raw(), 0x0666);
    }

    #[test]
    fn test_write_then_read() {
        let mut slots = OutputSlots::for_response::<SyscallSamples>();
        let mut params = slots.params();
        let samples = SyscallSamples {
            start: 10,
            received: 25,
            returned: 40,
        };
        write_response(&mut params, &samples).unwrap();
        for index in 0..3 {
            match &params[index] {
                Param::MemrefOutput(out) => assert_eq!(out.size(), SLOT_SIZE),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(read_response::<SyscallSamples>(&params).unwrap(), samples);
    }

    #[test]
    fn test_distinct_capacities_get_independent_sizes() {
        let mut a = [0u8; 8];
        let mut b = [0u8; 16];
        let mut c = [0u8; 32];
        let mut params = Params::new([
            Param::MemrefOutput(OutputBuffer::new(&mut a)),
            Param::MemrefOutput(OutputBuffer::new(&mut b)),
            Param::MemrefOutput(OutputBuffer::new(&mut c)),
            Param::None,
        ]);
        let samples = SyscallSamples {
            start: 1,
            received: 2,
            returned: 3,
        };
        write_response(&mut params, &samples).unwrap();
        for index in 0..3 {
            match &params[index] {
                Param::MemrefOutput(out) => {
                    assert_eq!(out.size(), SLOT_SIZE, "buffer {}", index);
                    assert_eq!(out.data(), &((index as u64) + 1).to_ne_bytes());
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        drop(params);
        assert!(b[SLOT_SIZE..].iter().all(|&x| x == 0));
        assert!(c[SLOT_SIZE..].iter().all(|&x| x == 0));
    }

    #[test]
    fn test_short_buffer_rejected_before_any_write() {
        let mut a = [0u8; 8];
        let mut b = [0u8; 4];
        let mut c = [0u8; 8];
        let mut params = Params::new([
            Param::MemrefOutput(OutputBuffer::new(&mut a)),
            Param::MemrefOutput(OutputBuffer::new(&mut b)),
            Param::MemrefOutput(OutputBuffer::new(&mut c)),
            Param::None,
        ]);
        let err = write_response(&mut params, &SyscallSamples::default()).unwrap_err();
        assert_eq!(
            err,
            BufferError::Short {
                index: 1,
                capacity: 4,
                required: SLOT_SIZE
            }
        );
        assert_eq!(err.tee_error(), TeeError::ShortBuffer);
        match &params[1] {
            Param::MemrefOutput(out) => assert_eq!(out.size(), SLOT_SIZE),
            other => panic!("unexpected {:?}", other),
        }
        drop(params);
        assert_eq!(a, [0u8; 8]);
        assert_eq!(b, [0u8; 4]);
        assert_eq!(c, [0u8; 8]);
    }

    #[test]
    fn test_read_rejects_short_size() {
        let mut slots = OutputSlots::for_response::<EntrySample>();
        let mut params = slots.params();
        if let Param::MemrefOutput(out) = &mut params[0] {
            out.set_size(4);
        }
        assert_eq!(
            read_response::<EntrySample>(&params).unwrap_err(),
            BufferError::SizeMismatch {
                index: 0,
                expected: SLOT_SIZE,
                actual: 4
            }
        );
    }

    #[test]
    fn test_read_rejects_size_beyond_capacity() {
        let mut small = [0u8; 4];
        let mut out = OutputBuffer::new(&mut small);
        out.set_size(SLOT_SIZE);
        let params = Params::new([
            Param::MemrefOutput(out),
            Param::None,
            Param::None,
            Param::None,
        ]);
        assert_eq!(
            read_response::<EntrySample>(&params).unwrap_err(),
            BufferError::Short {
                index: 0,
                capacity: 4,
                required: SLOT_SIZE
            }
        );
    }

    #[test]
    fn test_read_rejects_missing_buffer() {
        let params = Params::none();
        assert_eq!(
            read_response::<EntrySample>(&params).unwrap_err(),
            BufferError::UnexpectedParam {
                index: 0,
                expected: ParamType::MemrefOutput,
                actual: ParamType::None
            }
        );
    }

    #[test]
    fn test_params_start_zeroed() {
        let mut slots = OutputSlots::new(2);
        {
            let mut params = slots.params();
            write_response(&mut params, &EntrySample { counter: u64::MAX }).unwrap();
        }
        let params = slots.params();
        assert_eq!(params.types(), ParamTypes::outputs(2));
        match &params[0] {
            Param::MemrefOutput(out) => assert_eq!(out.data(), &[0u8; SLOT_SIZE]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
