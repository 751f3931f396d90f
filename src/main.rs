use std::sync::Arc;

use huji::config::Config;
use huji::router::Router;
use huji::server;
use serde_json::json;

fn app() -> Router {
    let mut router = Router::new();

    router
        .use_all("/", |req, res, next| {
            tracing::info!(method = %req.method, path = %req.path, "Incoming request");
            next.run(req, res);
            Ok(())
        })
        .get("/hello", |_req, res, _next| {
            res.set("Content-Type", "text/plain").send("Hello from huji\n");
            Ok(())
        })
        .get("/users/:id", |req, res, _next| {
            res.json(&json!({ "id": req.params.get("id") }));
            Ok(())
        })
        .post("/echo", |req, res, _next| {
            res.cookie("seen", "1", [("Path", "/")]).json(&req.body_params);
            Ok(())
        });

    router
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let router = Arc::new(app());

    tokio::select! {
        res = server::listener::run(&cfg, router) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
