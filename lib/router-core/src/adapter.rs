//! Route event adapter
//!
//! Turns untyped resource notifications into [`Operation`]s. Anything that
//! is not a well-formed Route is logged and dropped here so the control loop
//! only ever sees typed values.
//!
//! A resource watch that reconnects re-lists instead of replaying deletes.
//! The adapter remembers every route it has emitted and, when a re-list
//! completes, removes the ones that were not listed again.

use crate::{CoreError, Operation, Result};
use kube::api::DynamicObject;
use kube::Resource;
use kube_runtime::watcher;
use router_api::{Route, RouteSpec};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Feeds route operations into the control loop
#[derive(Debug)]
pub struct RouteEventAdapter {
    operations: mpsc::Sender<Operation>,
    /// Routes currently believed to exist, by prefix
    known: BTreeMap<String, RouteSpec>,
    /// Prefixes seen since the last `Init`, while a list is in progress
    relisted: Option<HashSet<String>>,
}

impl RouteEventAdapter {
    pub fn new(operations: mpsc::Sender<Operation>) -> Self {
        Self {
            operations,
            known: BTreeMap::new(),
            relisted: None,
        }
    }

    /// A route appeared (including the initial list replay)
    pub async fn on_add(&mut self, obj: &DynamicObject) {
        let Some(route) = check_route(obj) else {
            return;
        };

        info!(prefix = %route.prefix, service = %route.service, "Adding route");
        self.track(&route);
        self.emit(Operation::Add(route)).await;
    }

    /// A route changed; handled as an upsert of the new object
    pub async fn on_update(&mut self, _old: Option<&DynamicObject>, new: &DynamicObject) {
        let Some(route) = check_route(new) else {
            return;
        };

        info!(prefix = %route.prefix, service = %route.service, "Updating route");
        self.track(&route);
        self.emit(Operation::Add(route)).await;
    }

    /// A route was deleted
    pub async fn on_delete(&mut self, obj: &DynamicObject) {
        let Some(route) = check_route(obj) else {
            return;
        };

        info!(prefix = %route.prefix, service = %route.service, "Deleting route");
        self.known.remove(&route.prefix);
        self.emit(Operation::Remove(route)).await;
    }

    /// Dispatch one event from the resource watch stream
    pub async fn handle_event(&mut self, event: watcher::Event<DynamicObject>) {
        match event {
            watcher::Event::Apply(obj) => self.on_update(None, &obj).await,
            watcher::Event::InitApply(obj) => self.on_add(&obj).await,
            watcher::Event::Delete(obj) => self.on_delete(&obj).await,
            watcher::Event::Init => {
                debug!("Route watch (re)listing");
                self.relisted = Some(HashSet::new());
            }
            watcher::Event::InitDone => {
                debug!("Route watch list complete");
                self.remove_unlisted().await;
            }
        }
    }

    fn track(&mut self, route: &RouteSpec) {
        self.known.insert(route.prefix.clone(), route.clone());
        if let Some(relisted) = &mut self.relisted {
            relisted.insert(route.prefix.clone());
        }
    }

    // Routes deleted while the watch was down never get a Delete event.
    async fn remove_unlisted(&mut self) {
        let Some(relisted) = self.relisted.take() else {
            return;
        };

        let gone: Vec<String> = self
            .known
            .keys()
            .filter(|prefix| !relisted.contains(*prefix))
            .cloned()
            .collect();

        for prefix in gone {
            if let Some(route) = self.known.remove(&prefix) {
                info!(prefix = %route.prefix, service = %route.service, "Route no longer listed, removing");
                self.emit(Operation::Remove(route)).await;
            }
        }
    }

    // Blocks until the control loop takes the operation.
    async fn emit(&self, op: Operation) {
        if self.operations.send(op).await.is_err() {
            warn!("Route controller stopped, dropping operation");
        }
    }
}

fn check_route(obj: &DynamicObject) -> Option<RouteSpec> {
    match parse_route(obj) {
        Ok(route) => Some(route),
        Err(e) => {
            error!(
                name = obj.metadata.name.as_deref().unwrap_or("unknown"),
                "Route watch received an invalid object: {}", e
            );
            None
        }
    }
}

/// Interpret an untyped object as a Route spec
pub fn parse_route(obj: &DynamicObject) -> Result<RouteSpec> {
    let types = obj
        .types
        .as_ref()
        .ok_or_else(|| CoreError::InvalidObject("missing apiVersion/kind".to_string()))?;

    let api_version = Route::api_version(&());
    let kind = Route::kind(&());
    if types.api_version != api_version || types.kind != kind {
        return Err(CoreError::InvalidObject(format!(
            "expected {}/{}, got {}/{}",
            api_version, kind, types.api_version, types.kind
        )));
    }

    let route: Route = serde_json::from_value(serde_json::to_value(obj)?)?;
    if route.prefix().is_empty() {
        return Err(CoreError::InvalidObject("empty prefix".to_string()));
    }
    if route.service().is_empty() {
        return Err(CoreError::InvalidObject("empty service".to_string()));
    }

    Ok(route.spec)
}
