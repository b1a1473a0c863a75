mod parse;
mod service;

pub use parse::{parse_opts, Opts};
pub use service::build_service_config;
