//! Host tooling for the note pool: configuration, logging and the concrete
//! backends behind the core's collaborator traits.

pub mod command_prover;
pub mod config;
pub mod logging;
pub mod pool;
pub mod snapshot_file;

pub use command_prover::CommandProver;
pub use config::{pairing_rule_from_env, PoolConfig};
pub use logging::setup_logger;
pub use pool::{field_to_u256, u256_to_field, PoolLedger};
pub use snapshot_file::{read_json, write_json, SnapshotFile};
