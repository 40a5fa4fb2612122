//! Route resource watch feeding the route controller

use futures::StreamExt;
use kube::api::{ApiResource, DynamicObject};
use kube::{Api, Client};
use kube_runtime::{watcher, WatchStreamExt};
use router_api::Route;
use router_core::RouteEventAdapter;
use tokio::sync::watch;
use tracing::{info, warn};

/// Stream Route events into the adapter until shutdown
pub async fn run(
    client: Client,
    namespace: Option<String>,
    mut adapter: RouteEventAdapter,
    mut shutdown: watch::Receiver<bool>,
) {
    let resource = ApiResource::erase::<Route>(&());
    let routes: Api<DynamicObject> = match &namespace {
        Some(ns) => Api::namespaced_with(client, ns, &resource),
        None => Api::all_with(client, &resource),
    };

    info!(
        namespace = namespace.as_deref().unwrap_or("*"),
        "Starting Route watch"
    );

    let mut stream = watcher(routes, watcher::Config::default())
        .default_backoff()
        .boxed();

    loop {
        tokio::select! {
            event = stream.next() => match event {
                Some(Ok(event)) => adapter.handle_event(event).await,
                Some(Err(e)) => warn!("Route watch error: {}", e),
                None => break,
            },
            _ = stopped(&mut shutdown) => break,
        }
    }

    info!("Route watch stopped");
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
