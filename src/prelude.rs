pub use crate::checker::{identity_model, Checker, CheckerStats, RefModel};
pub use crate::executor::{JoinHandle, Task};
pub use crate::fault::Fault;
pub use crate::monitor::{Backlog, DataValidMonitor, DualMonitor};
pub use crate::runner::{run_test, TestResult, TestSuite};
pub use crate::scoreboard::Scoreboard;
pub use crate::signal::SimObject;
pub use crate::tb_obj::TbObj;
pub use crate::transaction::Transaction;
pub use crate::trigger::Trigger;
pub use crate::utils;
pub use crate::value::{Logic, Val};
pub use crate::TbResult;
pub use futures::future::FutureExt;
