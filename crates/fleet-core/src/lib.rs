pub mod config;
pub mod error;
pub mod nodes;

pub use config::{FleetConfig, HealthSettings, RemoteSettings, parse_duration};
pub use error::{ErrorKind, FleetError, FleetResult};
pub use nodes::{DEFAULT_HOST_LIST, HostList};
