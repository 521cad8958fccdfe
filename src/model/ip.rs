use serde::{Deserialize, Serialize};
use crate::ip::{AddressFamily, ResolutionSource};

#[derive(Debug, Clone, Serialize)]
pub struct IpDetectResult {
	pub ip: String,
	pub family: AddressFamily,
	pub source: ResolutionSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpSignalsQuery {
	/// Comma-separated signal names, all of them when absent.
	pub signals: Option<String>,
	pub v4_only: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpCheckQuery {
	pub ip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpCheckResult {
	pub input: String,
	pub ip: String,
	pub family: AddressFamily,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reduced: Option<String>,
	pub private: bool,
	pub subnets: Vec<String>,
}
