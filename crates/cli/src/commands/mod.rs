pub mod configure;
pub mod deploy;
pub mod dev;
pub mod predict;
