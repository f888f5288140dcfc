//! Game simulation modules

pub mod asteroid;
pub mod client;
pub mod combat;
pub mod math;
pub mod projectile;
pub mod runtime;
pub mod session;
pub mod ship;
pub mod snapshot;
pub mod state;
pub mod tuning;

pub use runtime::{ClientId, ClientSink, GameRuntime, RuntimeEvent, RuntimeHandle, SinkError};
pub use state::GameStatus;
pub use tuning::GameConfig;
