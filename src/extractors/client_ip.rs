use std::net::SocketAddr;
use std::sync::Arc;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::request::Parts;
use axum::http::StatusCode;
use log::debug;
use crate::ip::{HeaderBag, ResolutionCandidate};
use crate::model::ErrorDTO;
use crate::state::AppState;

/// Header and peer address snapshot of the current request.
#[derive(Debug, Clone)]
pub struct RequestSignals {
	pub headers: HeaderBag,
	pub remote_addr: String,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestSignals {
	type Rejection = ErrorDTO;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let mut peer = parts.extensions.get::<ConnectInfo<SocketAddr>>()
			.map(|v| v.ip());
		if peer.is_none() {
			peer = parts.extensions.get::<MockConnectInfo<SocketAddr>>()
				.map(|v| v.0.ip());
		}
		// Dual-stack listeners report IPv4 peers as `::ffff:a.b.c.d`.
		Ok(Self {
			headers: HeaderBag::from_header_map(&parts.headers),
			remote_addr: peer.map(|ip| ip.to_canonical().to_string()).unwrap_or_default(),
		})
	}
}

/// The resolved address of the end user.
#[derive(Debug, Clone)]
pub struct ClientIp(pub ResolutionCandidate);

impl FromRequestParts<Arc<AppState>> for ClientIp {
	type Rejection = ErrorDTO;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &Arc<AppState>,
	) -> Result<Self, Self::Rejection> {
		let signals = RequestSignals::from_request_parts(parts, state).await?;
		let resolved = state.resolver.resolve(
			&signals.headers,
			&signals.remote_addr,
			state.config.v4_only,
		);
		match resolved {
			Some(candidate) => {
				metrics::counter!(
					"client_ip_resolutions_total",
					"source" => candidate.source.as_str(),
				).increment(1);
				Ok(Self(candidate))
			}
			None => {
				debug!("Unable to resolve client address (remote_addr={:?})", signals.remote_addr);
				metrics::counter!("client_ip_unresolved_total").increment(1);
				Err(ErrorDTO::new_static(
					StatusCode::BAD_REQUEST,
					"Unable to determine client IP address",
				))
			}
		}
	}
}
