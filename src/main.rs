use std::net::SocketAddr;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use log::info;
use tokio::net::TcpListener;
use crate::config::AppConfig;
use crate::handlers::build_router;
use crate::state::AppState;

mod config;
mod extractors;
mod handlers;
mod ip;
mod model;
mod state;

#[tokio::main]
async fn main() {
	let _ = dotenvy::dotenv();
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
	let config = AppConfig::load_from_env().expect("Invalid configuration");
	match &config.self_subnet {
		Some(subnet) => info!("Peers from {subnet} are treated as reverse proxies"),
		None => info!("SERVER_ADDR is not set, self subnet check is disabled"),
	}
	info!("Operator subnets: {}", config.subnets.len());
	let state = AppState::new(config.clone());
	let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
	let router = build_router(state)
		.route("/metrics", get(|| async move { metric_handle.render() }))
		.layer(prometheus_layer);
	let listener = TcpListener::bind(config.listen_addr)
		.await
		.expect("Unable to bind TCP listener");
	info!("Listening on http://{}/", listener.local_addr().expect("Unable to get local address"));
	axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
		.await
		.expect("Unable to start Axum server");
}
