// Licensed under the Apache-2.0 license

pub mod loopback;
#[cfg(feature = "optee")]
pub mod teec;

pub use loopback::{Faults, LoopbackClient, LoopbackEvent};
#[cfg(feature = "optee")]
pub use teec::TeecClient;
