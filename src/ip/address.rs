use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use serde::Serialize;
use crate::ip::ipv6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
	V4,
	V6,
}

impl AddressFamily {
	/// Bits per group: octets for V4, hextets for V6.
	pub const fn group_bits(self) -> u8 {
		match self {
			Self::V4 => 8,
			Self::V6 => 16,
		}
	}

	pub const fn width(self) -> u8 {
		match self {
			Self::V4 => 32,
			Self::V6 => 128,
		}
	}
}

/// Classifies `text` as an IPv4 or IPv6 literal.
///
/// The unspecified addresses (`0.0.0.0`, `::` and every spelling of it) are
/// rejected, as is anything that isn't a complete literal.
pub fn validate(text: &str) -> Option<AddressFamily> {
	if text.is_empty() {
		return None;
	}
	if let Ok(addr) = text.parse::<Ipv4Addr>() {
		return (!addr.is_unspecified()).then_some(AddressFamily::V4);
	}
	if text.parse::<Ipv6Addr>().is_ok() && ipv6::reduce(&ipv6::normalize(text)) != "::" {
		return Some(AddressFamily::V6);
	}
	None
}

/// A validated address split into family-sized groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
	text: String,
	family: AddressFamily,
	groups: Vec<u16>,
}

impl ParsedAddress {
	/// Validates and splits `text`. IPv6 input goes through [`ipv6::normalize`]
	/// first, so IPv4-mapped literals land in their spliced form.
	pub fn parse(text: &str) -> Option<Self> {
		validate(text)?;
		Self::parse_network(text)
	}

	/// Like [`ParsedAddress::parse`], but the unspecified address is allowed,
	/// as it is for a network like `0.0.0.0/0`.
	pub fn parse_network(text: &str) -> Option<Self> {
		if let Ok(addr) = text.parse::<Ipv4Addr>() {
			return Some(Self {
				text: text.to_owned(),
				family: AddressFamily::V4,
				groups: addr.octets().iter().map(|octet| u16::from(*octet)).collect(),
			});
		}
		let addr = ipv6::normalize(text).parse::<Ipv6Addr>().ok()?;
		Some(Self {
			text: text.to_owned(),
			family: AddressFamily::V6,
			groups: addr.segments().to_vec(),
		})
	}

	/// The text this address was parsed from.
	pub fn original(&self) -> &str {
		&self.text
	}

	pub fn family(&self) -> AddressFamily {
		self.family
	}

	/// Octets (V4) or hextets (V6), most significant first.
	pub fn groups(&self) -> &[u16] {
		&self.groups
	}

	/// The address as one fixed-width integer. V4 occupies the low 32 bits.
	pub fn to_bits(&self) -> u128 {
		let shift = self.family.group_bits();
		self.groups()
			.iter()
			.fold(0u128, |acc, group| (acc << shift) | u128::from(*group))
	}

	pub fn is_v4(&self) -> bool {
		self.family == AddressFamily::V4
	}
}

impl fmt::Display for ParsedAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (separator, hex) = match self.family {
			AddressFamily::V4 => ('.', false),
			AddressFamily::V6 => (':', true),
		};
		for (i, group) in self.groups.iter().enumerate() {
			if i > 0 {
				write!(f, "{separator}")?;
			}
			if hex {
				write!(f, "{group:x}")?;
			} else {
				write!(f, "{group}")?;
			}
		}
		Ok(())
	}
}
