mod service;

pub use service::PollerService;
