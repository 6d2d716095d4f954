// Holder Raffle Engine
// A recurring raffle for token holders: snapshot entry, paid tickets and a
// weighted draw with an append-only winner history

// Core modules
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Round lifecycle
pub mod ledger;
pub mod machine;
pub mod orchestrator;
pub mod rounds;
pub mod selector;

// Persistence and collaborators
pub mod archive;
pub mod clock;
pub mod config;
pub mod holders;
pub mod rate_limit;
pub mod snapshot;
pub mod store;

pub use config::GameConfig;
pub use error::{ErrorKind, GameError};
pub use orchestrator::{Orchestrator, RecoveryAction, RecoveryReport, RoundStarted, StartRequest};
pub use processor::{GameResponse, Processor};
pub use state::{Entrant, Round, RoundStatus, WinnerRecord, WinnerSummary};
