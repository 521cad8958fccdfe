use std::sync::Arc;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::TypedHeader;
use constant_time_eq::constant_time_eq;
use crate::model::ErrorDTO;
use crate::state::AppState;

/// Passes when no `API_KEY` is configured or the bearer token matches it.
pub struct Auth;

impl FromRequestParts<Arc<AppState>> for Auth {
	type Rejection = ErrorDTO;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &Arc<AppState>,
	) -> Result<Self, Self::Rejection> {
		let Some(token) = &state.config.api_key else { return Ok(Auth) };
		let auth = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
			.await
			.map_err(|_| ErrorDTO::unauthorized())?;
		if !constant_time_eq(auth.token().as_bytes(), token.as_bytes()) {
			return Err(ErrorDTO::unauthorized());
		}
		Ok(Auth)
	}
}
