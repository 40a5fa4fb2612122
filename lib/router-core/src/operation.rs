//! Typed route operations consumed by the control loop

use router_api::RouteSpec;

/// A single change to the desired route set
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Insert or replace the route for its prefix
    Add(RouteSpec),
    /// Drop the route for its prefix
    Remove(RouteSpec),
}

impl Operation {
    pub fn route(&self) -> &RouteSpec {
        match self {
            Operation::Add(route) | Operation::Remove(route) => route,
        }
    }

    /// Label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Add(_) => "add",
            Operation::Remove(_) => "remove",
        }
    }
}
