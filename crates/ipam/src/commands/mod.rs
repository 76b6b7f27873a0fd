//! Command handlers: bridge CLI args -> core calls -> output formatting.

pub mod addresses;
pub mod config_cmd;
pub mod subnets;
pub mod util;
pub mod zones;
