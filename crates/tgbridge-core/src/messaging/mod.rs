//! Ports between the bridge, the messaging platform and the host runtime.

pub mod port;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;
