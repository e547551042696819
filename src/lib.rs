mod checker;
mod event;
mod executor;
mod fault;
mod monitor;
pub mod prelude;
pub mod report;
mod runner;
mod scoreboard;
mod signal;
pub mod sim_if;
mod tb_obj;
mod transaction;
mod trigger;
pub mod utils;
mod value;

/// Result of a testbench task. `Ok` carries an arbitrary payload for the
/// harness, `Err` carries the fault that terminated the run.
pub type TbResult = Result<value::Val, fault::Fault>;

pub use checker::{identity_model, Checker, CheckerStats, RefModel};
pub use event::EventSim;
pub use executor::{JoinHandle, Task};
pub use fault::Fault;
pub use monitor::{Backlog, DataValidMonitor, DualMonitor};
pub use runner::{run_test, Test, TestResult, TestSuite};
pub use scoreboard::Scoreboard;
pub use signal::SimObject;
pub use tb_obj::TbObj;
pub use transaction::Transaction;
pub use trigger::Trigger;
pub use value::{Logic, Val};
