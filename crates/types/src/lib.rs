mod network;
mod nonce_pinning;
mod phase;
mod report;

pub use network::*;
pub use nonce_pinning::*;
pub use phase::*;
pub use report::*;
