// Licensed under the Apache-2.0 license

//! Status codes and error origins shared by both worlds.

use core::fmt;

/// Non-success status of a TEE call. Values follow the GlobalPlatform
/// client and internal API definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeError {
    Generic,
    AccessDenied,
    Cancel,
    ExcessData,
    BadFormat,
    BadParameters,
    BadState,
    ItemNotFound,
    NotImplemented,
    NotSupported,
    NoData,
    OutOfMemory,
    Busy,
    Communication,
    Security,
    ShortBuffer,
    TargetDead,
    /// A code outside the set above.
    Unknown(u32),
}

impl TeeError {
    pub const SUCCESS: u32 = 0;

    /// Convert from a raw status. Returns `None` for success.
    pub fn from_raw(code: u32) -> Option<Self> {
        let err = match code {
            Self::SUCCESS => return None,
            0xFFFF_0000 => TeeError::Generic,
            0xFFFF_0001 => TeeError::AccessDenied,
            0xFFFF_0002 => TeeError::Cancel,
            0xFFFF_0004 => TeeError::ExcessData,
            0xFFFF_0005 => TeeError::BadFormat,
            0xFFFF_0006 => TeeError::BadParameters,
            0xFFFF_0007 => TeeError::BadState,
            0xFFFF_0008 => TeeError::ItemNotFound,
            0xFFFF_0009 => TeeError::NotImplemented,
            0xFFFF_000A => TeeError::NotSupported,
            0xFFFF_000B => TeeError::NoData,
            0xFFFF_000C => TeeError::OutOfMemory,
            0xFFFF_000D => TeeError::Busy,
            0xFFFF_000E => TeeError::Communication,
            0xFFFF_000F => TeeError::Security,
            0xFFFF_0010 => TeeError::ShortBuffer,
            0xFFFF_3024 => TeeError::TargetDead,
            other => TeeError::Unknown(other),
        };
        Some(err)
    }

    /// Raw status code.
    pub fn code(self) -> u32 {
        match self {
            TeeError::Generic => 0xFFFF_0000,
            TeeError::AccessDenied => 0xFFFF_0001,
            TeeError::Cancel => 0xFFFF_0002,
            TeeError::ExcessData => 0xFFFF_0004,
            TeeError::BadFormat => 0xFFFF_0005,
            TeeError::BadParameters => 0xFFFF_0006,
            TeeError::BadState => 0xFFFF_0007,
            TeeError::ItemNotFound => 0xFFFF_0008,
            TeeError::NotImplemented => 0xFFFF_0009,
            TeeError::NotSupported => 0xFFFF_000A,
            TeeError::NoData => 0xFFFF_000B,
            TeeError::OutOfMemory => 0xFFFF_000C,
            TeeError::Busy => 0xFFFF_000D,
            TeeError::Communication => 0xFFFF_000E,
            TeeError::Security => 0xFFFF_000F,
            TeeError::ShortBuffer => 0xFFFF_0010,
            TeeError::TargetDead => 0xFFFF_3024,
            TeeError::Unknown(code) => code,
        }
    }
}

impl fmt::Display for TeeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeeError::Generic => write!(f, "Generic error"),
            TeeError::AccessDenied => write!(f, "Access denied"),
            TeeError::Cancel => write!(f, "Cancelled"),
            TeeError::ExcessData => write!(f, "Excess data"),
            TeeError::BadFormat => write!(f, "Bad format"),
            TeeError::BadParameters => write!(f, "Bad parameters"),
            TeeError::BadState => write!(f, "Bad state"),
            TeeError::ItemNotFound => write!(f, "Item not found"),
            TeeError::NotImplemented => write!(f, "Not implemented"),
            TeeError::NotSupported => write!(f, "Not supported"),
            TeeError::NoData => write!(f, "No data"),
            TeeError::OutOfMemory => write!(f, "Out of memory"),
            TeeError::Busy => write!(f, "Busy"),
            TeeError::Communication => write!(f, "Communication error"),
            TeeError::Security => write!(f, "Security violation"),
            TeeError::ShortBuffer => write!(f, "Short buffer"),
            TeeError::TargetDead => write!(f, "Target dead"),
            TeeError::Unknown(code) => write!(f, "Unknown error 0x{:08x}", code),
        }
    }
}

/// Result type for trusted application callbacks.
pub type TeeResult<T = ()> = core::result::Result<T, TeeError>;

/// The layer that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The client API library itself.
    Api,
    /// The transport between the client library and the TEE.
    Comms,
    /// The TEE core.
    Tee,
    /// The trusted application.
    TrustedApp,
    Unknown(u32),
}

impl ErrorOrigin {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ErrorOrigin::Api,
            2 => ErrorOrigin::Comms,
            3 => ErrorOrigin::Tee,
            4 => ErrorOrigin::TrustedApp,
            other => ErrorOrigin::Unknown(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            ErrorOrigin::Api => 1,
            ErrorOrigin::Comms => 2,
            ErrorOrigin::Tee => 3,
            ErrorOrigin::TrustedApp => 4,
            ErrorOrigin::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorOrigin::Api => write!(f, "client API"),
            ErrorOrigin::Comms => write!(f, "transport"),
            ErrorOrigin::Tee => write!(f, "TEE"),
            ErrorOrigin::TrustedApp => write!(f, "trusted application"),
            ErrorOrigin::Unknown(_) => write!(f, "unknown"),
        }
    }
}

/// A failed call as seen by the client: status plus originating layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub error: TeeError,
    pub origin: ErrorOrigin,
}

impl Failure {
    pub fn new(error: TeeError, origin: ErrorOrigin) -> Self {
        Self { error, origin }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code 0x{:08x} origin 0x{:x} ({}: {})",
            self.error.code(),
            self.origin.raw(),
            self.origin,
            self.error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        let all = [
            TeeError::Generic,
            TeeError::AccessDenied,
            TeeError::Cancel,
            TeeError::ExcessData,
            TeeError::BadFormat,
            TeeError::BadParameters,
            TeeError::BadState,
            TeeError::ItemNotFound,
            TeeError::NotImplemented,
            TeeError::NotSupported,
            TeeError::NoData,
            TeeError::OutOfMemory,
            TeeError::Busy,
            TeeError::Communication,
            TeeError::Security,
            TeeError::ShortBuffer,
            TeeError::TargetDead,
        ];
        for err in all {
            assert_eq!(TeeError::from_raw(err.code()), Some(err));
        }
        assert_eq!(TeeError::from_raw(0), None);
        assert_eq!(TeeError::from_raw(0x1234), Some(TeeError::Unknown(0x1234)));
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::new(TeeError::BadParameters, ErrorOrigin::TrustedApp);
        assert_eq!(
            failure.to_string(),
            "code 0xffff0006 origin 0x4 (trusted application: Bad parameters)"
        );
    }
}
