use std::sync::Arc;
use crate::config::AppConfig;
use crate::ip::Resolver;

pub struct AppState {
	pub config: Arc<AppConfig>,
	pub resolver: Arc<Resolver>,
}

impl AppState {
	pub fn new(config: Arc<AppConfig>) -> Arc<Self> {
		let resolver = Arc::new(Resolver::new(config.self_subnet.clone()));

		Arc::new(Self {
			config,
			resolver,
		})
	}
}
