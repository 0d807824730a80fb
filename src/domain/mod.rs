pub mod account;
pub mod clock;
pub mod origin;
pub mod telemetry;
pub mod token_cache;
