use std::collections::VecDeque;

use log::debug;

use crate::checker::{Checker, CheckerStats, RefModel};
use crate::executor::{JoinHandle, Task};
use crate::fault::Fault;
use crate::signal::SimObject;
use crate::tb_obj::TbObj;
use crate::transaction::Transaction;
use crate::TbResult;

/// Per-side queue of sampled transactions, written by exactly one monitor
/// and drained from the head by the checker. An `Err` entry carries a
/// sampling fault (indeterminate data) in-band to the consumer.
pub type Backlog = TbObj<VecDeque<Result<Transaction, Fault>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    NotStarted,
    Running,
    Stopped,
}

/// Reusable monitor of a one-way data/valid streaming interface.
///
/// While running it samples every configured data signal on each rising
/// clock edge where `valid` reads as exactly 1, and appends one transaction
/// per such cycle to its backlog. An indeterminate `valid` counts as
/// deasserted; an indeterminate data field is surfaced as a fault, never
/// coerced.
pub struct DataValidMonitor {
    clk: SimObject,
    valid: SimObject,
    datas: Vec<(&'static str, SimObject)>,
    values: Backlog,
    task: Option<JoinHandle>,
    state: Lifecycle,
}

impl DataValidMonitor {
    pub fn new(clk: SimObject, valid: SimObject, datas: Vec<(&'static str, SimObject)>) -> Self {
        Self {
            clk,
            valid,
            datas,
            values: TbObj::new(VecDeque::new()),
            task: None,
            state: Lifecycle::NotStarted,
        }
    }

    /// Shared handle to this monitor's backlog (the consumer side).
    pub fn values(&self) -> Backlog {
        self.values.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state == Lifecycle::Running
    }

    /// Begin sampling from the next clock edge onward.
    pub fn start(&mut self) -> Result<(), Fault> {
        match self.state {
            Lifecycle::Running => Err(Fault::lifecycle("monitor already started")),
            Lifecycle::Stopped => Err(Fault::lifecycle(
                "monitor was stopped; restart requires a fresh instance",
            )),
            Lifecycle::NotStarted => {
                debug!("starting monitor on valid signal '{}'", self.valid.name());
                self.task = Some(Task::fork(sample_loop(
                    self.clk,
                    self.valid,
                    self.datas.clone(),
                    self.values.clone(),
                )));
                self.state = Lifecycle::Running;
                Ok(())
            }
        }
    }

    /// Halt sampling. Cancels the in-flight wait outright: once this
    /// returns, the backlog can no longer be mutated.
    pub fn stop(&mut self) -> Result<(), Fault> {
        match self.task.take() {
            None => Err(Fault::lifecycle("monitor never started")),
            Some(task) => {
                task.cancel();
                self.state = Lifecycle::Stopped;
                Ok(())
            }
        }
    }
}

async fn sample_loop(
    clk: SimObject,
    valid: SimObject,
    datas: Vec<(&'static str, SimObject)>,
    values: Backlog,
) -> TbResult {
    loop {
        clk.rising_edge().await;
        if !valid.is_high() {
            // idle: park on the valid signal instead of polling every cycle
            valid.rising_edge().await;
            continue;
        }
        let mut txn = Transaction::new();
        let mut fault = None;
        for (name, sig) in &datas {
            match sig.u64() {
                Ok(v) => txn.push(name, v),
                Err(e) => {
                    fault = Some(e);
                    break;
                }
            }
        }
        match fault {
            None => values.get_mut().push_back(Ok(txn)),
            Some(e) => {
                // surface the sampling fault to the consumer and stop;
                // everything after this point would be garbage anyway
                values.get_mut().push_back(Err(e.clone()));
                return Err(e);
            }
        }
    }
}

/// Two [`DataValidMonitor`]s (input side, output side) plus the live
/// [`Checker`], with one synchronized lifecycle. The only public surface is
/// start/stop and the checker verdict.
pub struct DualMonitor {
    input: DataValidMonitor,
    output: DataValidMonitor,
    clk: SimObject,
    model: RefModel,
    n_expected: u64,
    max_cycles: u64,
    checker: Option<JoinHandle>,
    stats: TbObj<CheckerStats>,
    state: Lifecycle,
}

impl DualMonitor {
    pub fn new(
        clk: SimObject,
        input: DataValidMonitor,
        output: DataValidMonitor,
        model: RefModel,
        n_expected: u64,
        max_cycles: u64,
    ) -> Self {
        Self {
            input,
            output,
            clk,
            model,
            n_expected,
            max_cycles,
            checker: None,
            stats: TbObj::new(CheckerStats::default()),
            state: Lifecycle::NotStarted,
        }
    }

    /// Start both monitors and the checker. Fails without side effects if
    /// anything was already running.
    pub fn start(&mut self) -> Result<(), Fault> {
        if self.state != Lifecycle::NotStarted {
            return Err(Fault::lifecycle("dual monitor already started"));
        }
        if self.input.is_running() || self.output.is_running() {
            return Err(Fault::lifecycle("a monitor side is already running"));
        }
        self.input.start()?;
        self.output.start()?;
        let checker = Checker::new(
            self.clk,
            self.input.values(),
            self.output.values(),
            self.model.clone(),
            self.n_expected,
            self.max_cycles,
            self.stats.clone(),
        );
        self.checker = Some(Task::fork(checker.run()));
        self.state = Lifecycle::Running;
        Ok(())
    }

    /// Stop the checker first (cancelling its wait), then both monitors, so
    /// no producer keeps writing after its consumer is gone.
    pub fn stop(&mut self) -> Result<(), Fault> {
        if self.state != Lifecycle::Running {
            return Err(Fault::lifecycle("dual monitor is not running"));
        }
        if let Some(checker) = self.checker.take() {
            checker.cancel();
        }
        self.input.stop()?;
        self.output.stop()?;
        self.state = Lifecycle::Stopped;
        Ok(())
    }

    /// Await the checker's verdict: `Ok` after `n_expected` matched pairs,
    /// or the fault that ended checking. The monitors keep running and
    /// still need a `stop()`.
    pub async fn verdict(&mut self) -> TbResult {
        match self.checker.take() {
            Some(handle) => handle.await,
            None => Err(Fault::lifecycle("checker is not running")),
        }
    }

    pub fn stats(&self) -> CheckerStats {
        *self.stats.get()
    }

    pub fn input_backlog(&self) -> Backlog {
        self.input.values()
    }

    pub fn output_backlog(&self) -> Backlog {
        self.output.values()
    }
}
