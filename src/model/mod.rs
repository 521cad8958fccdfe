mod errors;
mod ip;

pub use errors::*;
pub use ip::*;
