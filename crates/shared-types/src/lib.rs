pub mod access;
pub mod error;
pub mod feature_flags;

pub use access::*;
pub use error::*;
pub use feature_flags::*;
