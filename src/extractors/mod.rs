mod auth;
mod client_ip;

pub use auth::*;
pub use client_ip::*;
