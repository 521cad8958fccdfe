use std::sync::Arc;
use axum::extract::{Query, State};
use axum::{Json, Router};
use axum::http::StatusCode;
use axum::routing::get;
use crate::extractors::{Auth, ClientIp, RequestSignals};
use crate::ip::{is_private, reduce, AddressFamily, ParsedAddress, Resolved, Signal};
use crate::model::{ErrorDTO, IpCheckQuery, IpCheckResult, IpDetectResult, IpSignalsQuery};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
	Router::new()
		.route("/api/ip", get(detect_ip))
		.route("/api/ip/signals", get(detect_signals))
		.route("/api/ip/check", get(check_ip))
		.with_state(state)
}

async fn detect_ip(ClientIp(candidate): ClientIp) -> Json<IpDetectResult> {
	Json(IpDetectResult {
		ip: candidate.canonical(),
		family: candidate.address.family(),
		source: candidate.source,
	})
}

async fn detect_signals(
	State(state): State<Arc<AppState>>,
	signals: RequestSignals,
	Query(query): Query<IpSignalsQuery>,
) -> Result<Json<Resolved>, ErrorDTO> {
	let selector = match query.signals.as_deref() {
		Some(names) => names.split(',')
			.filter(|name| !name.trim().is_empty())
			.map(str::parse)
			.collect::<Result<Vec<Signal>, _>>()
			.map_err(ErrorDTO::bad_request)?,
		None => Signal::ALL.to_vec(),
	};
	let v4_only = query.v4_only.unwrap_or(state.config.v4_only);
	Ok(Json(state.resolver.resolve_signals(
		&signals.headers,
		&signals.remote_addr,
		&selector,
		v4_only,
	)))
}

async fn check_ip(
	State(state): State<Arc<AppState>>,
	_auth: Auth,
	Query(query): Query<IpCheckQuery>,
) -> Result<Json<IpCheckResult>, ErrorDTO> {
	let input = query.ip.trim();
	let address = ParsedAddress::parse(input).ok_or_else(|| ErrorDTO::new(
		StatusCode::BAD_REQUEST,
		format!("Not a valid IP address: {input:?}"),
	))?;
	let subnets = state.config.subnets
		.iter()
		.filter(|block| block.matches(&address))
		.map(ToString::to_string)
		.collect();
	Ok(Json(IpCheckResult {
		input: address.original().to_owned(),
		ip: address.to_string(),
		family: address.family(),
		reduced: (address.family() == AddressFamily::V6).then(|| reduce(&address.to_string())),
		private: is_private(&address),
		subnets,
	}))
}
