use std::sync::Arc;

use log::{debug, info};

use crate::fault::Fault;
use crate::monitor::Backlog;
use crate::signal::SimObject;
use crate::tb_obj::TbObj;
use crate::transaction::Transaction;
use crate::value::Val;
use crate::TbResult;

/// Pure transform predicting the output-side record for one input-side
/// record. Identity on the data field for a plain FIFO; any order-preserving
/// transform works.
pub type RefModel = Arc<dyn Fn(&Transaction) -> Transaction + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckerStats {
    /// Clock edges observed since start.
    pub cycles: u64,
    /// Matched pairs consumed and verified.
    pub checked: u64,
}

/// Live scoreboard: drains matched head-of-queue pairs from the two monitor
/// backlogs once per clock edge, applies the reference model and compares.
///
/// Pairing is strictly positional; the device under verification is assumed
/// to preserve arrival order, so no matching-by-key is attempted. The first
/// mismatch ends the run. A cycle watchdog converts "the design never
/// produced output" into an explicit timeout fault.
pub struct Checker {
    clk: SimObject,
    input: Backlog,
    output: Backlog,
    model: RefModel,
    n_expected: u64,
    max_cycles: u64,
    stats: TbObj<CheckerStats>,
}

impl Checker {
    pub fn new(
        clk: SimObject,
        input: Backlog,
        output: Backlog,
        model: RefModel,
        n_expected: u64,
        max_cycles: u64,
        stats: TbObj<CheckerStats>,
    ) -> Self {
        Self {
            clk,
            input,
            output,
            model,
            n_expected,
            max_cycles,
            stats,
        }
    }

    pub async fn run(self) -> TbResult {
        loop {
            {
                let stats = *self.stats.get();
                if stats.checked >= self.n_expected {
                    info!(
                        "checker done: {} pairs verified in {} cycles",
                        stats.checked, stats.cycles
                    );
                    return Ok(Val::Int(stats.checked));
                }
                if stats.cycles >= self.max_cycles {
                    return Err(Fault::Timeout {
                        cycles: stats.cycles,
                        checked: stats.checked,
                    });
                }
            }

            self.clk.rising_edge().await;
            self.stats.get_mut().cycles += 1;

            // a transaction may legitimately show up on one side cycles
            // before its counterpart, so wait until both heads exist
            if self.input.get().is_empty() || self.output.get().is_empty() {
                continue;
            }
            let input = self.input.get_mut().pop_front().unwrap()?;
            let actual = self.output.get_mut().pop_front().unwrap()?;

            let expected = (self.model)(&input);
            if !expected.matches(&actual) {
                return Err(Fault::Mismatch { expected, actual });
            }
            let checked = {
                let mut stats = self.stats.get_mut();
                stats.checked += 1;
                stats.checked
            };
            debug!("pair {} matched: {}", checked, actual);
        }
    }
}

/// Reference model for devices whose contract is "out equals in, in order":
/// maps the input-side `field` to the output-side `field` unchanged.
pub fn identity_model(input_field: &'static str, output_field: &'static str) -> RefModel {
    Arc::new(move |input: &Transaction| {
        let mut expected = Transaction::new();
        if let Some(v) = input.get(input_field) {
            expected.push(output_field, v);
        }
        expected
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Task;
    use crate::monitor::Backlog;
    use crate::runner::run_test;
    use crate::utils;
    use std::collections::VecDeque;

    fn txn(field: &'static str, v: u64) -> Result<Transaction, Fault> {
        Ok([(field, v)].into_iter().collect())
    }

    fn setup() -> (SimObject, Backlog, Backlog, TbObj<CheckerStats>) {
        let clk = SimObject::add_signal("clk", 1);
        Task::fork(utils::clock(clk, 10, "ns"));
        (
            clk,
            TbObj::new(VecDeque::new()),
            TbObj::new(VecDeque::new()),
            TbObj::new(CheckerStats::default()),
        )
    }

    #[test]
    fn matches_pairs_in_order() {
        let result = run_test(async {
            let (clk, input, output, stats) = setup();
            for v in [1u64, 2, 3] {
                input.get_mut().push_back(txn("din", v));
                output.get_mut().push_back(txn("dout", v));
            }
            let checker = Checker::new(
                clk,
                input,
                output,
                identity_model("din", "dout"),
                3,
                100,
                stats.clone(),
            );
            let verdict = checker.run().await;
            assert_eq!(stats.get().checked, 3);
            verdict
        });
        assert_eq!(result, Ok(Val::Int(3)));
    }

    #[test]
    fn delayed_output_side_is_tolerated() {
        let result = run_test(async {
            let (clk, input, output, stats) = setup();
            input.get_mut().push_back(txn("din", 9));
            let out = output.clone();
            Task::fork(async move {
                utils::clock_cycles(clk, 7).await?;
                out.get_mut().push_back(txn("dout", 9));
                Ok(Val::None)
            });
            Checker::new(
                clk,
                input,
                output,
                identity_model("din", "dout"),
                1,
                100,
                stats,
            )
            .run()
            .await
        });
        assert_eq!(result, Ok(Val::Int(1)));
    }

    #[test]
    fn mismatch_carries_both_records() {
        let result = run_test(async {
            let (clk, input, output, stats) = setup();
            input.get_mut().push_back(txn("din", 0xaa));
            output.get_mut().push_back(txn("dout", 0xab));
            Checker::new(
                clk,
                input,
                output,
                identity_model("din", "dout"),
                1,
                100,
                stats,
            )
            .run()
            .await
        });
        let expected: Transaction = [("dout", 0xaa_u64)].into_iter().collect();
        let actual: Transaction = [("dout", 0xab_u64)].into_iter().collect();
        assert_eq!(result, Err(Fault::Mismatch { expected, actual }));
    }

    #[test]
    fn watchdog_times_out_without_output() {
        let result = run_test(async {
            let (clk, input, output, stats) = setup();
            input.get_mut().push_back(txn("din", 1));
            let verdict = Checker::new(
                clk,
                input,
                output,
                identity_model("din", "dout"),
                1,
                20,
                stats.clone(),
            )
            .run()
            .await;
            assert_eq!(stats.get().cycles, 20);
            verdict
        });
        assert_eq!(
            result,
            Err(Fault::Timeout {
                cycles: 20,
                checked: 0
            })
        );
    }

    #[test]
    fn zero_expected_pairs_is_an_immediate_pass() {
        let result = run_test(async {
            let (clk, input, output, stats) = setup();
            Checker::new(
                clk,
                input,
                output,
                identity_model("din", "dout"),
                0,
                100,
                stats,
            )
            .run()
            .await
        });
        assert_eq!(result, Ok(Val::Int(0)));
    }

    #[test]
    fn indeterminate_backlog_entry_propagates() {
        let result = run_test(async {
            let (clk, input, output, stats) = setup();
            input
                .get_mut()
                .push_back(Err(Fault::indeterminate("in_data")));
            output.get_mut().push_back(txn("dout", 0));
            Checker::new(
                clk,
                input,
                output,
                identity_model("din", "dout"),
                1,
                100,
                stats,
            )
            .run()
            .await
        });
        assert_eq!(result, Err(Fault::indeterminate("in_data")));
    }
}
