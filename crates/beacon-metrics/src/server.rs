use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::gather_metrics;

#[derive(Default)]
pub struct ServerBuilder {
    serve_addr: Option<SocketAddr>,
    shutdown: Option<CancellationToken>,
}

impl ServerBuilder {
    pub fn serve_addr(mut self, addr: SocketAddr) -> Self {
        self.serve_addr = Some(addr);

        self
    }

    pub fn shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);

        self
    }

    /// Bind the metrics endpoint and serve `/metrics` until the shutdown token is cancelled.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let serve_addr = self
            .serve_addr
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));
        let shutdown = self.shutdown.unwrap_or_default();

        let app = Router::new().route("/metrics", get(|| async move { gather_metrics() }));

        let listener = TcpListener::bind(serve_addr).await?;
        info!("Starting metrics server on {}", serve_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    }
}
