use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use crate::ip::{CidrBlock, CidrParseError, ParsedAddress};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SELF_SUBNET_PREFIX: u8 = 24;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("LISTEN_ADDR must be a valid socket address: {0:?}")]
	ListenAddr(String),

	#[error("SERVER_ADDR must be a valid IP address: {0:?}")]
	ServerAddr(String),

	#[error("SELF_SUBNET_PREFIX must be an integer: {0:?}")]
	SelfSubnetPrefix(String),

	#[error("IPV4_ONLY must be a boolean: {0:?}")]
	Ipv4Only(String),

	#[error("Invalid self subnet: {0}")]
	SelfSubnet(CidrParseError),

	#[error("Invalid entry {entry:?} in SUBNETS: {source}")]
	Subnets {
		entry: String,
		source: CidrParseError,
	},
}

pub struct AppConfig {
	pub listen_addr: SocketAddr,
	/// The server's own address masked to `SELF_SUBNET_PREFIX`.
	pub self_subnet: Option<CidrBlock>,
	pub v4_only: bool,
	pub subnets: Vec<CidrBlock>,
	pub api_key: Option<String>,
}

impl AppConfig {
	pub fn load_from_env() -> Result<Arc<Self>, ConfigError> {
		Self::load_from(|name| env::var(name).ok())
	}

	pub fn load_from(var: impl Fn(&str) -> Option<String>) -> Result<Arc<Self>, ConfigError> {
		let listen_addr = var("LISTEN_ADDR")
			.unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
		let listen_addr = listen_addr.parse::<SocketAddr>()
			.map_err(|_| ConfigError::ListenAddr(listen_addr))?;
		let self_subnet_prefix = match var("SELF_SUBNET_PREFIX") {
			Some(prefix) => prefix.trim().parse()
				.map_err(|_| ConfigError::SelfSubnetPrefix(prefix))?,
			None => DEFAULT_SELF_SUBNET_PREFIX,
		};
		let self_subnet = match var("SERVER_ADDR").filter(|addr| !addr.trim().is_empty()) {
			Some(addr) => {
				let network = ParsedAddress::parse(addr.trim())
					.ok_or_else(|| ConfigError::ServerAddr(addr.clone()))?;
				let block = CidrBlock::new(network, self_subnet_prefix)
					.map_err(ConfigError::SelfSubnet)?;
				Some(block)
			}
			None => None,
		};
		let v4_only = match var("IPV4_ONLY") {
			Some(value) => parse_bool(&value).ok_or(ConfigError::Ipv4Only(value))?,
			None => true,
		};
		let subnets = var("SUBNETS")
			.unwrap_or_default()
			.split(',')
			.map(str::trim)
			.filter(|entry| !entry.is_empty())
			.map(|entry| entry.parse().map_err(|source| ConfigError::Subnets {
				entry: entry.to_owned(),
				source,
			}))
			.collect::<Result<Vec<_>, _>>()?;
		let api_key = var("API_KEY").filter(|key| !key.is_empty());

		Ok(Arc::new(Self {
			listen_addr,
			self_subnet,
			v4_only,
			subnets,
			api_key,
		}))
	}
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}
