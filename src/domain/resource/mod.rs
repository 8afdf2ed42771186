pub mod host;
pub mod link;
pub mod service;

pub use host::Host;
pub use link::Link;
pub use service::Service;
