// Licensed under the Apache-2.0 license

//! Property queries into the TEE core.

use latency_messages::{TeeError, TeeResult};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Property holding a [`TimerDescriptor`] sampled by the TEE core while it
/// services the query.
pub const TIMER_DESCRIPTOR_PROPERTY: &str = "gpd.tee.systemCounter.descriptor";

pub const TIMER_DESCRIPTOR_SIZE: usize = core::mem::size_of::<TimerDescriptor>();

/// Property set a query is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyScope {
    CurrentTa,
    CurrentClient,
    TeeImplementation,
}

impl PropertyScope {
    /// Pseudo-handle value of the property set (`TEE_PROPSET_*`).
    pub fn handle(self) -> u32 {
        match self {
            PropertyScope::CurrentTa => 0xFFFF_FFFF,
            PropertyScope::CurrentClient => 0xFFFF_FFFE,
            PropertyScope::TeeImplementation => 0xFFFF_FFFD,
        }
    }
}

/// System calls the trusted application makes into the TEE core.
pub trait SystemProperties {
    /// Read property `name` of `scope` as raw bytes into `out`, returning the
    /// number of bytes written. Crosses into the TEE core and may fail
    /// independently of the caller.
    fn get_property_as_binary_block(
        &self,
        scope: PropertyScope,
        name: &str,
        out: &mut [u8],
    ) -> TeeResult<usize>;
}

impl<T: SystemProperties + ?Sized> SystemProperties for &T {
    fn get_property_as_binary_block(
        &self,
        scope: PropertyScope,
        name: &str,
        out: &mut [u8],
    ) -> TeeResult<usize> {
        (**self).get_property_as_binary_block(scope, name, out)
    }
}

/// Blob returned for [`TIMER_DESCRIPTOR_PROPERTY`].
#[repr(C)]
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, Immutable, KnownLayout,
)]
pub struct TimerDescriptor {
    /// Counter sampled inside the TEE core.
    pub counter: u64,
    pub frequency: u32,
    pub reserved: u32,
}

impl TimerDescriptor {
    /// Parse a descriptor blob; anything but an exact-size blob is
    /// `BadFormat`.
    pub fn parse(blob: &[u8]) -> TeeResult<Self> {
        Self::read_from_bytes(blob).map_err(|_| TeeError::BadFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() {
        let desc = TimerDescriptor {
            counter: 0x1122_3344_5566_7788,
            frequency: 19_200_000,
            reserved: 0,
        };
        assert_eq!(TimerDescriptor::parse(desc.as_bytes()), Ok(desc));
    }

    #[test]
    fn test_parse_rejects_wrong_size() {
        let bytes = [0u8; TIMER_DESCRIPTOR_SIZE + 1];
        assert_eq!(
            TimerDescriptor::parse(&bytes[..TIMER_DESCRIPTOR_SIZE - 1]),
            Err(TeeError::BadFormat)
        );
        assert_eq!(TimerDescriptor::parse(&bytes), Err(TeeError::BadFormat));
    }

    #[test]
    fn test_scope_handles() {
        assert_eq!(PropertyScope::TeeImplementation.handle(), 0xFFFF_FFFD);
        assert_eq!(PropertyScope::CurrentClient.handle(), 0xFFFF_FFFE);
        assert_eq!(PropertyScope::CurrentTa.handle(), 0xFFFF_FFFF);
    }
}
