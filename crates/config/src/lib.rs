pub mod traits;

mod consts;
mod deployment;
mod errors;
mod networks;
mod strategy;
mod vault;

pub use crate::{consts::*, deployment::*, errors::*, networks::*, strategy::*, vault::*};
