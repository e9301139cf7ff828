pub mod deploy;
pub mod release;
pub mod setup;
pub mod smoke;
