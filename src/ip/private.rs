use std::sync::LazyLock;
use crate::ip::{matches_any, AddressFamily, CidrBlock, ParsedAddress};

const PRIVATE_V4: &[&str] = &[
	"10.0.0.0/8",
	"100.64.0.0/10",
	"172.16.0.0/12",
	"192.168.0.0/16",
	"127.0.0.1/32",
];

const PRIVATE_V6: &[&str] = &[
	"0:0:0:0:0:0:0:1/128",
	// ::ffff:127.0.0.1 once normalized
	"0:0:0:0:0:0:7f00:1/128",
];

static PRIVATE_NETWORKS: LazyLock<PrivateNetworks> = LazyLock::new(|| PrivateNetworks {
	v4: parse_table(PRIVATE_V4),
	v6: parse_table(PRIVATE_V6),
});

/// Reserved ranges that never identify an end user on their own.
#[derive(Debug)]
pub struct PrivateNetworks {
	v4: Vec<CidrBlock>,
	v6: Vec<CidrBlock>,
}

impl PrivateNetworks {
	pub fn global() -> &'static Self {
		&PRIVATE_NETWORKS
	}

	pub fn blocks(&self, family: AddressFamily) -> &[CidrBlock] {
		match family {
			AddressFamily::V4 => &self.v4,
			AddressFamily::V6 => &self.v6,
		}
	}

	pub fn contains(&self, address: &ParsedAddress) -> bool {
		matches_any(address, self.blocks(address.family()))
	}
}

pub fn is_private(address: &ParsedAddress) -> bool {
	PrivateNetworks::global().contains(address)
}

fn parse_table(table: &[&str]) -> Vec<CidrBlock> {
	table.iter()
		.map(|cidr| cidr.parse().expect("Invalid private network table entry"))
		.collect()
}
