//! Domain layer: pure decode/encode, cipher-suite policy and correlation.

pub mod correlation;
pub mod decoder;
pub mod encoder;
pub mod entities;
pub mod errors;
pub mod policy;
