use std::future::Future;
use std::time;

use futures::future::BoxFuture;
use log::debug;

use crate::event::EventSim;
use crate::executor::{self, Task};
use crate::fault::Fault;
use crate::sim_if;
use crate::trigger;
use crate::TbResult;

/// Run one testbench future against a fresh simulation.
///
/// Installs a new event kernel, drives the event loop until the future
/// completes, then tears everything down again. Every run starts from a
/// clean slate, so repeated runs with the same stimulus produce the same
/// verdict.
pub fn run_test(fut: impl Future<Output = TbResult> + Send + 'static) -> TbResult {
    run_test_timed(fut).0
}

fn run_test_timed(fut: impl Future<Output = TbResult> + Send + 'static) -> (TbResult, u64) {
    sim_if::install(Box::new(EventSim::new()));
    trigger::clear_all_triggers();
    executor::clear_ready_queue();

    let mut handle = Task::spawn_from_future(fut, "test");
    let result = loop {
        executor::run_once();
        if let Some(result) = handle.try_result() {
            break result;
        }
        match sim_if::with(|s| s.next_reaction()) {
            Some(reaction) => trigger::react(reaction.cb, reaction.edge),
            None => {
                break Err(Fault::lifecycle(
                    "simulation stalled: no scheduled events remain before test completion",
                ))
            }
        }
    };

    let sim_steps = sim_if::with(|s| s.get_sim_time_steps());
    debug!("test finished at t={} steps: {:?}", sim_steps, result);

    trigger::clear_all_triggers();
    executor::clear_ready_queue();
    sim_if::uninstall();
    (result, sim_steps)
}

/// A named testbench registered with a [`TestSuite`].
pub struct Test {
    pub name: String,
    pub generator: fn() -> BoxFuture<'static, TbResult>,
}

pub struct TestResult {
    pub name: String,
    pub result: TbResult,
    pub time_secs: f64,
    pub sim_steps: u64,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// A set of testbenches run back to back, each against its own fresh
/// simulation. Results feed the summary table and JUnit output in
/// [`crate::report`].
pub struct TestSuite {
    name: String,
    tests: Vec<Test>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&mut self, name: &str, generator: fn() -> BoxFuture<'static, TbResult>) {
        self.tests.push(Test {
            name: name.to_string(),
            generator,
        });
    }

    pub fn run(&self) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(self.tests.len());
        for test in &self.tests {
            let start = time::Instant::now();
            let (result, sim_steps) = run_test_timed((test.generator)());
            results.push(TestResult {
                name: test.name.clone(),
                result,
                time_secs: start.elapsed().as_secs_f64(),
                sim_steps,
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SimObject;
    use crate::trigger::Trigger;
    use crate::utils;
    use crate::value::Val;

    #[test]
    fn timer_advances_sim_time() {
        let result = run_test(async {
            Trigger::timer(25, "ns").await;
            let t = sim_if::with(|s| s.get_sim_time_steps());
            Ok(Val::Int(t))
        });
        // 25 ns at 1 ps precision
        assert_eq!(result, Ok(Val::Int(25_000)));
    }

    #[test]
    fn clock_edges_wake_waiters() {
        let result = run_test(async {
            let clk = SimObject::add_signal("clk", 1);
            Task::fork(utils::clock(clk, 10, "ns"));
            for _ in 0..4 {
                clk.rising_edge().await;
            }
            let t = sim_if::with(|s| s.get_sim_time("ns"));
            Ok(Val::Int(t as u64))
        });
        // first rising edge at 5ns, then every 10ns
        assert_eq!(result, Ok(Val::Int(35)));
    }

    #[test]
    fn falling_edge_filtering() {
        let result = run_test(async {
            let clk = SimObject::add_signal("clk", 1);
            Task::fork(utils::clock(clk, 10, "ns"));
            clk.rising_edge().await;
            clk.falling_edge().await;
            let t = sim_if::with(|s| s.get_sim_time("ns"));
            Ok(Val::Int(t as u64))
        });
        // rising at 5ns, falling at the next half period
        assert_eq!(result, Ok(Val::Int(10)));
    }

    #[test]
    fn read_only_sees_same_edge_writes() {
        let result = run_test(async {
            let clk = SimObject::add_signal("clk", 1);
            let d = SimObject::add_signal("d", 8);
            Task::fork(utils::clock(clk, 10, "ns"));
            Task::fork(async move {
                loop {
                    clk.rising_edge().await;
                    d.set(0x5a);
                }
            });
            // plain edge wake sees the pre-edge snapshot ...
            clk.rising_edge().await;
            assert_eq!(d.read(), crate::value::Logic::X);
            // ... the read-only phase sees the settled one
            Trigger::read_only().await;
            Ok(Val::Int(d.u64()?))
        });
        assert_eq!(result, Ok(Val::Int(0x5a)));
    }

    #[test]
    fn read_write_phase_runs_after_commits() {
        let result = run_test(async {
            let clk = SimObject::add_signal("clk", 1);
            let q = SimObject::add_signal("q", 1);
            Task::fork(utils::clock(clk, 10, "ns"));
            clk.rising_edge_rw().await?;
            q.set(1);
            clk.rising_edge().await;
            Ok(Val::Int(q.u64()?))
        });
        assert_eq!(result, Ok(Val::Int(1)));
    }

    #[test]
    fn stalled_test_is_a_lifecycle_fault() {
        let result = run_test(async {
            let sig = SimObject::add_signal("never", 1);
            sig.rising_edge().await;
            Ok(Val::None)
        });
        assert!(matches!(result, Err(Fault::Lifecycle(_))));
    }

    #[test]
    fn reruns_are_isolated() {
        for _ in 0..2 {
            let result = run_test(async {
                // same signal name both times: state must not leak across runs
                let clk = SimObject::add_signal("clk", 1);
                Task::fork(utils::clock(clk, 10, "ns"));
                utils::clock_cycles(clk, 3).await?;
                Ok(Val::None)
            });
            assert_eq!(result, Ok(Val::None));
        }
    }

    #[test]
    fn suite_collects_results() {
        let mut suite = TestSuite::new("unit");
        suite.register("passes", || {
            Box::pin(async {
                Trigger::timer_steps(5).await;
                Ok(Val::None)
            })
        });
        suite.register("fails", || {
            Box::pin(async { Err(Fault::lifecycle("deliberate")) })
        });
        let results = suite.run();
        assert_eq!(results.len(), 2);
        assert!(results[0].passed());
        assert!(!results[1].passed());
        assert_eq!(results[0].sim_steps, 5);
    }
}
