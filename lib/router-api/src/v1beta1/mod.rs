/// API version v1beta1 for Prefix Router CRDs

pub mod route;

pub use route::{Route, RouteSpec};
