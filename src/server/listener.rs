use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::{Config, ServerConfig};
use crate::http::connection::Connection;
use crate::router::Router;

/// Binds the configured address and serves connections until an accept fails.
pub async fn run(cfg: &Config, router: Arc<Router>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    serve(listener, &cfg.server, router).await
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    settings: &ServerConfig,
    router: Arc<Router>,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let settings = settings.clone();
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, router, &settings);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
