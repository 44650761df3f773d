#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod error;
pub use error::IcpError;

mod normal_equations;
pub use normal_equations::{compute_normal_equations, CorrespondenceParams, NormalEquations};

mod projective;
pub use projective::*;
