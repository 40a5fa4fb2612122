//! Health and metrics HTTP endpoint

use http_body_util::Full;
use hyper::{body::Bytes, server::conn::http1, service::service_fn, Method, Request, Response, StatusCode};
use hyper_util::rt::tokio::TokioIo;
use router_core::ControllerMetrics;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Serve /healthz and /metrics until shutdown, then drain connections
/// for at most `drain_timeout`
pub async fn listen_and_serve(
    addr: SocketAddr,
    drain_timeout: Duration,
    metrics: ControllerMetrics,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Error accepting HTTP connection: {}", e);
                        continue;
                    }
                };

                let metrics = metrics.clone();
                let mut shutdown = shutdown.clone();
                connections.spawn(async move {
                    let service = service_fn(move |req| {
                        let metrics = metrics.clone();
                        async move { Ok::<_, Infallible>(respond(&req, &metrics)) }
                    });

                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    tokio::pin!(conn);

                    let result = tokio::select! {
                        result = conn.as_mut() => result,
                        _ = stopped(&mut shutdown) => {
                            conn.as_mut().graceful_shutdown();
                            conn.as_mut().await
                        }
                    };
                    if let Err(e) = result {
                        debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
                    }
                });
            }
            _ = stopped(&mut shutdown) => break,
        }
    }

    drop(listener);
    let drained = tokio::time::timeout(drain_timeout, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    match drained {
        Ok(()) => info!("HTTP server stopped"),
        Err(_) => {
            error!("HTTP server graceful shutdown timed out");
            connections.abort_all();
        }
    }
    Ok(())
}

fn respond<B>(req: &Request<B>, metrics: &ControllerMetrics) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/healthz") => text(StatusCode::OK, "OK"),
        (&Method::GET, "/metrics") => match metrics.gather() {
            Ok(body) => {
                let mut response = text(StatusCode::OK, body);
                if let Ok(value) = "text/plain; version=0.0.4".parse() {
                    response.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
                }
                response
            }
            Err(e) => {
                warn!("Failed to gather metrics: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to gather metrics\n")
            }
        },
        _ => text(StatusCode::NOT_FOUND, "404 page not found\n"),
    }
}

fn text(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
