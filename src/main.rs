// src/main.rs
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use equipment_dashboard::app::{self, Flags};
use equipment_dashboard::config::AppConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,equipment_dashboard=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn main() -> iced::Result {
    init_tracing();

    let config = AppConfig::load().unwrap_or_else(|err| {
        error!(error = %err, "could not load configuration, using defaults");
        AppConfig::default()
    });
    let initial_path = std::env::args().nth(1).unwrap_or_else(|| "/".to_string());

    app::run(Flags {
        config: Arc::new(config),
        initial_path,
    })
}
