use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;
use crate::ip::{AddressFamily, ParsedAddress};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CidrParseError {
	#[error("Invalid network address: {0:?}")]
	InvalidAddress(String),

	#[error("Invalid prefix length: {0:?}")]
	InvalidPrefix(String),

	#[error("Prefix length {prefix_len} exceeds {width} bits")]
	PrefixOutOfRange {
		prefix_len: u8,
		width: u8,
	},

	#[error("Netmask notation is only supported for IPv4")]
	NetmaskOnIpv6,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrBlock {
	network: ParsedAddress,
	prefix_len: u8,
}

impl CidrBlock {
	pub fn new(network: ParsedAddress, prefix_len: u8) -> Result<Self, CidrParseError> {
		let width = network.family().width();
		if prefix_len > width {
			return Err(CidrParseError::PrefixOutOfRange { prefix_len, width });
		}
		Ok(Self {
			network,
			prefix_len,
		})
	}

	pub fn network(&self) -> &ParsedAddress {
		&self.network
	}

	pub fn prefix_len(&self) -> u8 {
		self.prefix_len
	}

	pub fn family(&self) -> AddressFamily {
		self.network.family()
	}

	/// Whether the leading `prefix_len` bits of `address` equal the network's.
	pub fn matches(&self, address: &ParsedAddress) -> bool {
		if address.family() != self.family() {
			return false;
		}
		let mask = prefix_mask(self.family(), self.prefix_len);
		address.to_bits() & mask == self.network.to_bits() & mask
	}
}

/// True if `address` falls inside at least one of `blocks`.
pub fn matches_any<'a>(
	address: &ParsedAddress,
	blocks: impl IntoIterator<Item = &'a CidrBlock>,
) -> bool {
	blocks.into_iter().any(|block| block.matches(address))
}

/// Converts a 32-bit netmask such as `0xFFFFFF00` to a prefix length.
///
/// Only the leading run of one bits counts, so a non-contiguous mask is cut
/// at its first zero bit.
pub fn mask_to_prefix_len(mask: u32) -> u8 {
	mask.leading_ones() as u8
}

fn prefix_mask(family: AddressFamily, prefix_len: u8) -> u128 {
	let width = family.width();
	if prefix_len == 0 {
		return 0;
	}
	let full = u128::MAX >> (128 - u32::from(width));
	(full << (width - prefix_len)) & full
}

impl FromStr for CidrBlock {
	type Err = CidrParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		let (network, prefix) = match s.split_once('/') {
			Some((network, prefix)) => (network.trim(), Some(prefix.trim())),
			None => (s, None),
		};
		let network = ParsedAddress::parse_network(network)
			.ok_or_else(|| CidrParseError::InvalidAddress(network.to_owned()))?;
		let prefix_len = match prefix {
			None => network.family().width(),
			Some(prefix) if prefix.contains('.') => {
				if network.family() != AddressFamily::V4 {
					return Err(CidrParseError::NetmaskOnIpv6);
				}
				let mask = prefix.parse::<Ipv4Addr>()
					.map_err(|_| CidrParseError::InvalidPrefix(prefix.to_owned()))?;
				mask_to_prefix_len(u32::from(mask))
			}
			Some(prefix) => prefix.parse::<u8>()
				.map_err(|_| CidrParseError::InvalidPrefix(prefix.to_owned()))?,
		};
		Self::new(network, prefix_len)
	}
}

impl fmt::Display for CidrBlock {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.network(), self.prefix_len)
	}
}
