//! End-to-end pipeline tests
//!
//! Drive the facade the way a recovery run does:
//! - config → toolkit → wallet decode → export / John hash
//! - disk image → scan → recovered keys that match wallet addresses

mod device_recovery;
mod fixtures;
mod wallet_dump;
