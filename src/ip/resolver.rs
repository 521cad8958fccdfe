use std::collections::BTreeMap;
use std::str::FromStr;
use log::debug;
use serde::Serialize;
use thiserror::Error;
use crate::ip::{is_private, CidrBlock, HeaderBag, ParsedAddress};

const X_FORWARDED_FOR: &str = "X-Forwarded-For";
const X_REAL_IP: &str = "X-Real-Ip";
const CLOUDFLARE_CLIENT_IP: &str = "Cf-Connecting-Ip";
const CLOUDFLARE_SIGNATURE: &[&str] = &[CLOUDFLARE_CLIENT_IP, "Cf-Ipcountry", "Cf-Ray"];
const SUCURI_CLIENT_IP: &str = "X-Sucuri-Clientip";
const SUCURI_SIGNATURE: &[&str] = &[SUCURI_CLIENT_IP, "X-Sucuri-Country"];
const OVH_CLIENT_IP: &str = "X-Cdn-Any-Ip";
const OVH_SIGNATURE: &[&str] = &[OVH_CLIENT_IP, "Remote-Ip"];
const INCAPSULA_CLIENT_IP: &str = "Incap-Client-Ip";
const INCAPSULA_SIGNATURE: &[&str] = &[INCAPSULA_CLIENT_IP];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
	RemoteAddr,
	XForwardedFor,
	XRealIp,
	Cloudflare,
	Sucuri,
	Ovh,
	Incapsula,
}

impl ResolutionSource {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::RemoteAddr => "remote_addr",
			Self::XForwardedFor => "x_forwarded_for",
			Self::XRealIp => "x_real_ip",
			Self::Cloudflare => "cloudflare",
			Self::Sucuri => "sucuri",
			Self::Ovh => "ovh",
			Self::Incapsula => "incapsula",
		}
	}
}

/// Reverse proxies recognized by their signature headers, in order of trust.
const PROVIDERS: &[(ResolutionSource, &[&str], &str)] = &[
	(ResolutionSource::Cloudflare, CLOUDFLARE_SIGNATURE, CLOUDFLARE_CLIENT_IP),
	(ResolutionSource::Sucuri, SUCURI_SIGNATURE, SUCURI_CLIENT_IP),
	(ResolutionSource::Ovh, OVH_SIGNATURE, OVH_CLIENT_IP),
	(ResolutionSource::Incapsula, INCAPSULA_SIGNATURE, INCAPSULA_CLIENT_IP),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionCandidate {
	pub source: ResolutionSource,
	pub address: ParsedAddress,
}

impl ResolutionCandidate {
	fn new(source: ResolutionSource, text: &str) -> Option<Self> {
		let address = ParsedAddress::parse(text)?;
		Some(Self {
			source,
			address,
		})
	}

	/// Canonical text: dotted quad for IPv4, the full eight-group form for IPv6.
	pub fn canonical(&self) -> String {
		self.address.to_string()
	}
}

/// A named client address signal that callers can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
	Real,
	RemoteAddr,
	XForwardedFor,
	XRealIp,
	CloudFlare,
}

impl Signal {
	pub const ALL: &[Signal] = &[
		Self::Real,
		Self::RemoteAddr,
		Self::XForwardedFor,
		Self::XRealIp,
		Self::CloudFlare,
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Real => "real",
			Self::RemoteAddr => "remote_addr",
			Self::XForwardedFor => "x_forwarded_for",
			Self::XRealIp => "x_real_ip",
			Self::CloudFlare => "cloud_flare",
		}
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown signal: {0:?}")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
	type Err = UnknownSignal;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		Self::ALL.iter()
			.copied()
			.find(|signal| signal.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| UnknownSignal(s.to_owned()))
	}
}

/// Outcome of a multi-signal resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Resolved {
	None,
	Single(String),
	Many(BTreeMap<Signal, String>),
}

/// Walks the trusted-proxy chain to find the address of the end user.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
	self_subnet: Option<CidrBlock>,
}

impl Resolver {
	/// `self_subnet` is the server's own network; a peer inside it is treated
	/// as an unrecognized reverse proxy.
	pub fn new(self_subnet: Option<CidrBlock>) -> Self {
		Self {
			self_subnet,
		}
	}

	/// [`Resolver::resolve_real`] restricted to IPv4 when `v4_only` is set.
	pub fn resolve(
		&self,
		headers: &HeaderBag,
		remote_addr: &str,
		v4_only: bool,
	) -> Option<ResolutionCandidate> {
		self.resolve_real(headers, remote_addr)
			.filter(|real| !v4_only || real.address.is_v4())
	}

	/// Resolves the single most trustworthy client address.
	pub fn resolve_real(&self, headers: &HeaderBag, remote_addr: &str) -> Option<ResolutionCandidate> {
		let mut real = ResolutionCandidate::new(ResolutionSource::RemoteAddr, remote_addr);

		if let Some(provider) = Self::provider_candidate(headers) {
			real = Some(provider);
		}

		if real.as_ref().is_none_or(|real| self.is_behind_proxy(&real.address)) {
			if let Some(forwarded) = Self::forwarded_candidate(headers) {
				real = Some(forwarded);
			}
		}

		debug!(
			"Resolved client address (remote_addr={remote_addr:?}, headers={}, real={:?}, source={:?})",
			headers.len(),
			real.as_ref().map(ResolutionCandidate::canonical),
			real.as_ref().map(|real| real.source),
		);
		real
	}

	/// Resolves each requested signal on its own, drops the ones filtered out
	/// by family and collapses duplicates. A lone value comes back as
	/// [`Resolved::Single`].
	pub fn resolve_signals(
		&self,
		headers: &HeaderBag,
		remote_addr: &str,
		signals: &[Signal],
		v4_only: bool,
	) -> Resolved {
		let mut seen: Vec<(Signal, String)> = Vec::with_capacity(signals.len());
		for signal in signals {
			if seen.iter().any(|(existing, _)| existing == signal) {
				continue;
			}
			let Some(candidate) = self.resolve_signal(*signal, headers, remote_addr) else { continue };
			if v4_only && !candidate.address.is_v4() {
				continue;
			}
			let value = candidate.canonical();
			if seen.iter().any(|(_, existing)| *existing == value) {
				continue;
			}
			seen.push((*signal, value));
		}
		match seen.len() {
			0 => Resolved::None,
			1 => Resolved::Single(seen.remove(0).1),
			_ => Resolved::Many(seen.into_iter().collect()),
		}
	}

	pub fn resolve_signal(
		&self,
		signal: Signal,
		headers: &HeaderBag,
		remote_addr: &str,
	) -> Option<ResolutionCandidate> {
		match signal {
			Signal::Real => self.resolve_real(headers, remote_addr),
			Signal::RemoteAddr => ResolutionCandidate::new(ResolutionSource::RemoteAddr, remote_addr),
			Signal::XForwardedFor => ResolutionCandidate::new(
				ResolutionSource::XForwardedFor,
				headers.first_token(X_FORWARDED_FOR)?,
			),
			Signal::XRealIp => ResolutionCandidate::new(
				ResolutionSource::XRealIp,
				headers.first_token(X_REAL_IP)?,
			),
			Signal::CloudFlare => {
				if !headers.contains_all(CLOUDFLARE_SIGNATURE) {
					return None;
				}
				ResolutionCandidate::new(
					ResolutionSource::Cloudflare,
					headers.first_token(CLOUDFLARE_CLIENT_IP)?,
				)
			}
		}
	}

	/// Private peers and peers from the server's own subnet mean some proxy we
	/// don't know about sits in front of us.
	pub fn is_behind_proxy(&self, address: &ParsedAddress) -> bool {
		is_private(address) || self.self_subnet
			.as_ref()
			.is_some_and(|subnet| subnet.matches(address))
	}

	/// The first provider whose signature is present decides; an unusable
	/// value from it does not hand over to the next provider. Nor does it
	/// reach `X-Forwarded-For` on its own: a public peer stays `real`, and
	/// forwarding headers are only read when the peer is behind a proxy.
	fn provider_candidate(headers: &HeaderBag) -> Option<ResolutionCandidate> {
		let (source, _, client_ip) = PROVIDERS
			.iter()
			.find(|(_, signature, _)| headers.contains_all(signature))?;
		let value = match source {
			ResolutionSource::Cloudflare => headers.first_token(client_ip)?,
			_ => headers.get(client_ip)?.trim(),
		};
		ResolutionCandidate::new(*source, value)
	}

	fn forwarded_candidate(headers: &HeaderBag) -> Option<ResolutionCandidate> {
		headers.first_token(X_FORWARDED_FOR)
			.and_then(|value| ResolutionCandidate::new(ResolutionSource::XForwardedFor, value))
			.or_else(|| {
				headers.first_token(X_REAL_IP)
					.and_then(|value| ResolutionCandidate::new(ResolutionSource::XRealIp, value))
			})
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use super::*;

	fn headers(pairs: &[(&str, &str)]) -> HeaderBag {
		pairs.iter().copied().collect()
	}

	fn cloudflare(ip: &str) -> Vec<(&str, &str)> {
		vec![("CF-Connecting-IP", ip), ("CF-IPCountry", "NL"), ("CF-RAY", "8a1b2c3d4e5f-AMS")]
	}

	fn real(resolver: &Resolver, pairs: &[(&str, &str)], remote_addr: &str) -> Option<(String, ResolutionSource)> {
		resolver.resolve_real(&headers(pairs), remote_addr)
			.map(|candidate| (candidate.canonical(), candidate.source))
	}

	#[test]
	fn test_public_peer_without_headers() {
		let resolved = real(&Resolver::default(), &[], "203.0.113.5");
		assert_eq!(resolved, Some(("203.0.113.5".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_private_peer_falls_back_to_forwarded_for() {
		let resolved = real(
			&Resolver::default(),
			&[("X-Forwarded-For", "198.51.100.7, 10.0.0.1")],
			"10.0.0.1",
		);
		assert_eq!(resolved, Some(("198.51.100.7".to_owned(), ResolutionSource::XForwardedFor)));
	}

	#[test]
	fn test_public_peer_ignores_forwarded_for() {
		let resolved = real(
			&Resolver::default(),
			&[("X-Forwarded-For", "198.51.100.7")],
			"203.0.113.5",
		);
		assert_eq!(resolved, Some(("203.0.113.5".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_cloudflare_overrides_private_peer() {
		let resolved = real(&Resolver::default(), &cloudflare("203.0.113.9"), "10.0.0.2");
		assert_eq!(resolved, Some(("203.0.113.9".to_owned(), ResolutionSource::Cloudflare)));
	}

	#[test]
	fn test_cloudflare_header_casing() {
		let pairs = [
			("cf-connecting-ip", "203.0.113.9, 198.51.100.1"),
			("cf-ipcountry", "NL"),
			("cf-ray", "8a1b2c3d4e5f-AMS"),
		];
		let resolved = real(&Resolver::default(), &pairs, "198.51.100.50");
		assert_eq!(resolved, Some(("203.0.113.9".to_owned(), ResolutionSource::Cloudflare)));
	}

	#[test]
	fn test_incomplete_cloudflare_signature_is_ignored() {
		let resolved = real(
			&Resolver::default(),
			&[("CF-Connecting-IP", "203.0.113.9"), ("CF-IPCountry", "NL")],
			"198.51.100.50",
		);
		assert_eq!(resolved, Some(("198.51.100.50".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_nothing_usable() {
		assert_eq!(real(&Resolver::default(), &[], ""), None);
		assert_eq!(real(&Resolver::default(), &[("X-Forwarded-For", "unknown")], "garbage"), None);
	}

	#[rstest]
	#[case(&[("X-Sucuri-Clientip", "203.0.113.20"), ("X-Sucuri-Country", "US")], ResolutionSource::Sucuri)]
	#[case(&[("X-CDN-Any-IP", "203.0.113.20"), ("Remote-IP", "10.0.0.9")], ResolutionSource::Ovh)]
	#[case(&[("Incap-Client-IP", " 203.0.113.20 ")], ResolutionSource::Incapsula)]
	fn test_providers(#[case] pairs: &[(&str, &str)], #[case] source: ResolutionSource) {
		let resolved = real(&Resolver::default(), pairs, "10.0.0.3");
		assert_eq!(resolved, Some(("203.0.113.20".to_owned(), source)));
	}

	#[test]
	fn test_sucuri_requires_country() {
		let resolved = real(&Resolver::default(), &[("X-Sucuri-Clientip", "203.0.113.20")], "198.51.100.50");
		assert_eq!(resolved, Some(("198.51.100.50".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_cloudflare_wins_over_other_providers() {
		let mut pairs = cloudflare("203.0.113.9");
		pairs.push(("Incap-Client-Ip", "203.0.113.20"));
		let resolved = real(&Resolver::default(), &pairs, "10.0.0.2");
		assert_eq!(resolved, Some(("203.0.113.9".to_owned(), ResolutionSource::Cloudflare)));
	}

	#[test]
	fn test_invalid_provider_value_does_not_fall_through() {
		let mut pairs = cloudflare("not-an-ip");
		pairs.push(("Incap-Client-Ip", "203.0.113.20"));
		let resolved = real(&Resolver::default(), &pairs, "198.51.100.50");
		assert_eq!(resolved, Some(("198.51.100.50".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_invalid_provider_value_keeps_public_peer_over_forwarded_for() {
		let mut pairs = cloudflare("junk");
		pairs.push(("X-Forwarded-For", "198.51.100.7"));
		let resolved = real(&Resolver::default(), &pairs, "203.0.113.5");
		assert_eq!(resolved, Some(("203.0.113.5".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_private_provider_value_triggers_fallback() {
		let mut pairs = cloudflare("192.168.1.10");
		pairs.push(("X-Forwarded-For", "198.51.100.7"));
		let resolved = real(&Resolver::default(), &pairs, "203.0.113.5");
		assert_eq!(resolved, Some(("198.51.100.7".to_owned(), ResolutionSource::XForwardedFor)));
	}

	#[test]
	fn test_real_ip_after_invalid_forwarded_for() {
		let resolved = real(
			&Resolver::default(),
			&[("X-Forwarded-For", "unknown"), ("X-Real-IP", "198.51.100.8")],
			"127.0.0.1",
		);
		assert_eq!(resolved, Some(("198.51.100.8".to_owned(), ResolutionSource::XRealIp)));
	}

	#[test]
	fn test_private_peer_kept_without_forwarding_headers() {
		let resolved = real(&Resolver::default(), &[], "192.168.1.1");
		assert_eq!(resolved, Some(("192.168.1.1".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_invalid_peer_falls_back() {
		let resolved = real(&Resolver::default(), &[("X-Real-Ip", "198.51.100.8")], "");
		assert_eq!(resolved, Some(("198.51.100.8".to_owned(), ResolutionSource::XRealIp)));
	}

	#[test]
	fn test_self_subnet_triggers_fallback() {
		let resolver = Resolver::new(Some("198.51.100.20/24".parse().unwrap()));
		let pairs = [("X-Forwarded-For", "203.0.113.77")];
		assert_eq!(
			real(&resolver, &pairs, "198.51.100.200"),
			Some(("203.0.113.77".to_owned(), ResolutionSource::XForwardedFor)),
		);
		assert_eq!(
			real(&resolver, &pairs, "198.51.101.200"),
			Some(("198.51.101.200".to_owned(), ResolutionSource::RemoteAddr)),
		);
	}

	#[test]
	fn test_ipv6_peer_is_normalized() {
		let resolved = real(&Resolver::default(), &[], "2001:DB8::1");
		assert_eq!(resolved, Some(("2001:db8:0:0:0:0:0:1".to_owned(), ResolutionSource::RemoteAddr)));
	}

	#[test]
	fn test_resolve_family_filter() {
		let resolver = Resolver::default();
		let bag = headers(&[]);
		assert!(resolver.resolve(&bag, "2001:db8::1", true).is_none());
		assert!(resolver.resolve(&bag, "2001:db8::1", false).is_some());
		assert!(resolver.resolve(&bag, "203.0.113.5", true).is_some());
	}

	#[test]
	fn test_ipv6_loopback_falls_back() {
		let resolved = real(&Resolver::default(), &[("X-Forwarded-For", "2001:db8::7")], "::1");
		assert_eq!(resolved, Some(("2001:db8:0:0:0:0:0:7".to_owned(), ResolutionSource::XForwardedFor)));
	}

	#[test]
	fn test_signals_collapse_to_single_value() {
		let resolved = Resolver::default().resolve_signals(
			&headers(&[]),
			"203.0.113.5",
			Signal::ALL,
			true,
		);
		assert_eq!(resolved, Resolved::Single("203.0.113.5".to_owned()));
	}

	#[test]
	fn test_signals_disagree() {
		let resolved = Resolver::default().resolve_signals(
			&headers(&[("X-Forwarded-For", "198.51.100.7"), ("X-Real-Ip", "198.51.100.8")]),
			"10.0.0.1",
			Signal::ALL,
			true,
		);
		let expected = BTreeMap::from([
			(Signal::Real, "198.51.100.7".to_owned()),
			(Signal::RemoteAddr, "10.0.0.1".to_owned()),
			(Signal::XRealIp, "198.51.100.8".to_owned()),
		]);
		assert_eq!(resolved, Resolved::Many(expected));
	}

	#[test]
	fn test_signals_cloudflare_slot() {
		let resolved = Resolver::default().resolve_signals(
			&headers(&cloudflare("203.0.113.9")),
			"10.0.0.2",
			&[Signal::CloudFlare, Signal::RemoteAddr],
			true,
		);
		let expected = BTreeMap::from([
			(Signal::RemoteAddr, "10.0.0.2".to_owned()),
			(Signal::CloudFlare, "203.0.113.9".to_owned()),
		]);
		assert_eq!(resolved, Resolved::Many(expected));
	}

	#[test]
	fn test_signals_family_filter() {
		let resolver = Resolver::default();
		let bag = headers(&[]);
		assert_eq!(resolver.resolve_signals(&bag, "2001:db8::1", Signal::ALL, true), Resolved::None);
		assert_eq!(
			resolver.resolve_signals(&bag, "2001:db8::1", Signal::ALL, false),
			Resolved::Single("2001:db8:0:0:0:0:0:1".to_owned()),
		);
	}

	#[test]
	fn test_signals_nothing() {
		let resolved = Resolver::default().resolve_signals(&headers(&[]), "", Signal::ALL, false);
		assert_eq!(resolved, Resolved::None);
		assert_eq!(serde_json::to_value(&resolved).unwrap(), serde_json::Value::Null);
	}

	#[test]
	fn test_signal_from_str() {
		assert_eq!("real".parse::<Signal>(), Ok(Signal::Real));
		assert_eq!(" X_Forwarded_For ".parse::<Signal>(), Ok(Signal::XForwardedFor));
		assert_eq!("cloud_flare".parse::<Signal>(), Ok(Signal::CloudFlare));
		assert_eq!("foo".parse::<Signal>(), Err(UnknownSignal("foo".to_owned())));
	}

	#[test]
	fn test_resolved_serialization() {
		let many = Resolved::Many(BTreeMap::from([
			(Signal::Real, "198.51.100.7".to_owned()),
			(Signal::XRealIp, "198.51.100.8".to_owned()),
		]));
		assert_eq!(
			serde_json::to_string(&many).unwrap(),
			r#"{"real":"198.51.100.7","x_real_ip":"198.51.100.8"}"#,
		);
		assert_eq!(serde_json::to_string(&Resolved::Single("1.1.1.1".to_owned())).unwrap(), r#""1.1.1.1""#);
	}
}
