use crate::fault::Fault;
use crate::sim_if;
use crate::trigger::Trigger;
use crate::value::{Logic, Val};
use crate::TbResult;

/// Handle to a named signal on the installed simulation backend.
///
/// Handles are plain copyable references; all state lives in the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimObject {
    handle: usize,
    width: u32,
}

impl SimObject {
    /// Declare a new signal on the current simulation. Panics on duplicate
    /// names or unsupported widths, which are configuration errors.
    pub fn add_signal(name: &str, width: u32) -> Self {
        let handle = sim_if::with(|s| s.add_signal(name, width));
        Self { handle, width }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        sim_if::with(|s| {
            s.get_handle_by_name(name).map(|handle| Self {
                handle,
                width: s.get_size(handle),
            })
        })
    }

    pub fn handle(&self) -> usize {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn name(&self) -> String {
        sim_if::with(|s| s.get_full_name(self.handle))
            .expect("signal handle without backing signal")
    }

    /// Current committed value, possibly indeterminate.
    pub fn read(&self) -> Logic {
        sim_if::with(|s| s.get_value(self.handle))
    }

    /// Current value as an integer. An indeterminate signal is a fault, not
    /// a zero.
    pub fn u64(&self) -> Result<u64, Fault> {
        match self.read() {
            Logic::V(v) => Ok(v),
            Logic::X => Err(Fault::indeterminate(self.name())),
        }
    }

    /// True iff the signal is resolved and exactly 1. An indeterminate
    /// signal is never "high".
    pub fn is_high(&self) -> bool {
        self.read().is_high()
    }

    pub fn is_low(&self) -> bool {
        self.read().is_low()
    }

    /// Schedule a write. Takes effect once the current task wave settles,
    /// so other tasks woken at the same edge still observe the old value.
    pub fn set(&self, val: u64) {
        let mask = if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        };
        sim_if::with(|s| s.set_value(self.handle, Logic::V(val & mask)));
    }

    /// Drive the signal to an indeterminate state.
    pub fn set_x(&self) {
        sim_if::with(|s| s.set_value(self.handle, Logic::X));
    }

    // convenience functions to get edge triggers for this signal
    pub fn rising_edge(self) -> Trigger {
        Trigger::rising_edge(self)
    }

    pub fn falling_edge(self) -> Trigger {
        Trigger::falling_edge(self)
    }

    pub fn edge(self) -> Trigger {
        Trigger::edge(self)
    }

    pub async fn rising_edge_rw(self) -> TbResult {
        self.rising_edge().await;
        Trigger::read_write().await;
        Ok(Val::None)
    }

    pub async fn rising_edge_ro(self) -> TbResult {
        self.rising_edge().await;
        Trigger::read_only().await;
        Ok(Val::None)
    }
}
