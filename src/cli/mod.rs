pub mod args;
pub mod config;
pub mod run;

pub use args::{Cli, Commands, ConfigAction, Invocation};
pub use run::{execute, run, Command, Outcome, Request, RunError};

/// Process exit statuses. Each failure class gets its own code so wrapper scripts can
/// tell them apart.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const ARGUMENTS: u8 = 1;
    pub const STORE_CONNECTION: u8 = 2;
    pub const STORE_UNAVAILABLE: u8 = 3;
    pub const NOT_FOUND: u8 = 4;
    pub const CONFIG: u8 = 5;
    pub const INVALID_OPERATION: u8 = 6;
}
