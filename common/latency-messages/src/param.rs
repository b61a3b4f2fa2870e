// Licensed under the Apache-2.0 license

//! Parameter slots carried by an open-session or invoke-command call.

use core::fmt;
use core::ops::{Index, IndexMut};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Number of parameter slots in every call.
pub const PARAM_COUNT: usize = 4;

/// Parameter slot type. Values match `TEEC_*`/`TEE_PARAM_TYPE_*` for
/// temporary memory references.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, TryFromPrimitive, IntoPrimitive)]
pub enum ParamType {
    #[default]
    None = 0,
    ValueInput = 1,
    ValueOutput = 2,
    ValueInout = 3,
    MemrefInput = 5,
    MemrefOutput = 6,
    MemrefInout = 7,
}

/// The four slot types of a call packed into one word, four bits per slot.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamTypes(u32);

impl ParamTypes {
    pub const NONE: ParamTypes = ParamTypes(0);

    pub const fn new(types: [ParamType; PARAM_COUNT]) -> Self {
        ParamTypes(
            (types[0] as u32)
                | ((types[1] as u32) << 4)
                | ((types[2] as u32) << 8)
                | ((types[3] as u32) << 12),
        )
    }

    /// `count` output buffers followed by unused slots.
    pub const fn outputs(count: usize) -> Self {
        let mut types = [ParamType::None; PARAM_COUNT];
        let mut i = 0;
        while i < count && i < PARAM_COUNT {
            types[i] = ParamType::MemrefOutput;
            i += 1;
        }
        Self::new(types)
    }

    pub const fn from_raw(raw: u32) -> Self {
        ParamTypes(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Type of slot `index`; `None` when the nibble is not a known type.
    pub fn get(self, index: usize) -> Option<ParamType> {
        if index >= PARAM_COUNT {
            return None;
        }
        ParamType::try_from((self.0 >> (index * 4)) & 0xF).ok()
    }
}

impl fmt::Debug for ParamTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_tuple("ParamTypes");
        for i in 0..PARAM_COUNT {
            match self.get(i) {
                Some(t) => list.field(&t),
                None => list.field(&((self.0 >> (i * 4)) & 0xF)),
            };
        }
        list.finish()
    }
}

/// Caller-owned buffer the callee fills.
///
/// The slice length is the capacity the caller declared. `size` starts out
/// equal to the capacity and is overwritten by the callee with the number of
/// bytes it produced (or, on a short buffer, the number it needed).
#[derive(Debug)]
pub struct OutputBuffer<'a> {
    buf: &'a mut [u8],
    size: usize,
}

impl<'a> OutputBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        let size = buf.len();
        Self { buf, size }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    /// The bytes the callee reported as written.
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.size.min(self.buf.len())]
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        self.buf
    }
}

/// One parameter slot.
#[derive(Debug, Default)]
pub enum Param<'a> {
    #[default]
    None,
    MemrefInput(&'a [u8]),
    MemrefOutput(OutputBuffer<'a>),
}

impl Param<'_> {
    pub fn param_type(&self) -> ParamType {
        match self {
            Param::None => ParamType::None,
            Param::MemrefInput(_) => ParamType::MemrefInput,
            Param::MemrefOutput(_) => ParamType::MemrefOutput,
        }
    }
}

/// The parameter slots of one call.
#[derive(Debug, Default)]
pub struct Params<'a>([Param<'a>; PARAM_COUNT]);

impl<'a> Params<'a> {
    pub fn new(slots: [Param<'a>; PARAM_COUNT]) -> Self {
        Params(slots)
    }

    /// All four slots unused.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn types(&self) -> ParamTypes {
        ParamTypes::new([
            self.0[0].param_type(),
            self.0[1].param_type(),
            self.0[2].param_type(),
            self.0[3].param_type(),
        ])
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Param<'a>> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Param<'a>> {
        self.0.iter_mut()
    }
}

impl<'a> Index<usize> for Params<'a> {
    type Output = Param<'a>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Params<'_> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}
