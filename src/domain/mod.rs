// Domain layer: data model, endpoints, ports and the service catalog.

pub mod catalog;
pub mod endpoint;
pub mod model;
pub mod ports;
