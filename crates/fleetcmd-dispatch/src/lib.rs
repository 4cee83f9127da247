//! fleetcmd-dispatch: run a script across a tagged fleet.
//!
//! # Components
//!
//! - **`discovery`**: paginated listing of running instances by tag
//! - **`batcher`**: order-preserving fixed-size chunks
//! - **`dispatcher`**: one invocation per batch, polled to a terminal status
//! - **`orchestrator`**: discovery → batches → concurrent workers → report
//!
//! # Failure isolation
//!
//! Discovery errors and an empty fleet abort the run. Everything after
//! that is per batch: a failed submission or poll is logged and recorded
//! in the [`RunReport`], and never cancels sibling batches.

pub mod batcher;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod report;

pub use batcher::chunk;
pub use discovery::discover_instances;
pub use dispatcher::{Dispatcher, InvocationOutcome, TerminalStatus};
pub use error::{DispatchError, RunError};
pub use orchestrator::Orchestrator;
pub use report::{BatchReport, RunReport};
