mod term;

pub mod address;
pub mod artifacts;
pub mod chain;
pub mod cmd;
pub mod config;
pub mod deployer;
pub mod ethereum;
pub mod verifier;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use term::{error, logger};
