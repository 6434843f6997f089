use std::net::Ipv4Addr;
use std::sync::Arc;

use paperstack::{api, config, logging, pipeline};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();
    let service = pipeline::PipelineService::from_config().await;
    let app = api::create_router(Arc::new(service));

    let port = config::get_config().server_port.unwrap_or(5050);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}
