mod address;
mod cidr;
mod headers;
mod ipv6;
mod private;
mod resolver;

pub use address::*;
pub use cidr::*;
pub use headers::*;
pub use ipv6::*;
pub use private::*;
pub use resolver::*;
