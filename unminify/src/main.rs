use std::sync::Arc;

use envconfig::Envconfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use unminify::{app_context::AppContext, config::Config, server::start_server};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_from_env().expect("Invalid configuration");
    let context = Arc::new(AppContext::new(&config));

    start_server(&config, context)
        .await
        .expect("Failed to start server");
}
