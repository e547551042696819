#![allow(clippy::result_unit_err)]

use std::cell::RefCell;

use crate::fault::Fault;
use crate::trigger::EdgeKind;
use crate::value::Logic;

thread_local! {
    // One simulation backend per thread, installed by the runner for the
    // duration of a test. Thread locality keeps parallel `cargo test`
    // threads fully isolated from each other.
    static SIM_IF: RefCell<Option<Box<dyn SimIf>>> = const { RefCell::new(None) };
}

/// Callback kinds a backend can schedule and deliver.
#[derive(Debug, Hash, Clone, Copy, Eq, PartialEq)]
pub enum SimCallback {
    /// Delivered when simulated time reaches the carried absolute step count.
    /// Registered with a relative delay; the backend reports back absolute
    /// time, mirroring what event-driven simulators do.
    Time(u64),
    /// Delivered when the carried signal handle commits a value change.
    Edge(usize),
    /// Delivered once all value changes of the current timestep settled and
    /// writing is still allowed.
    ReadWrite,
    /// Delivered at the very end of the current timestep; the observed
    /// snapshot is final.
    ReadOnly,
}

/// A callback that fired and must be delivered to the trigger layer.
#[derive(Debug, Clone, Copy)]
pub struct Reaction {
    pub cb: SimCallback,
    pub edge: Option<EdgeKind>,
}

/// The awaitable edge-source contract the verification core runs against.
///
/// The bundled [`crate::EventSim`] is the only backend in tree, but monitors,
/// triggers and the checker only ever talk to this trait, so the core stays
/// independent of any specific simulation engine.
pub trait SimIf {
    fn add_signal(&mut self, name: &str, width: u32) -> usize;
    fn get_handle_by_name(&self, name: &str) -> Option<usize>;
    fn get_full_name(&self, handle: usize) -> Result<String, Fault>;
    fn get_size(&self, handle: usize) -> u32;
    fn get_value(&self, handle: usize) -> Logic;
    fn set_value(&mut self, handle: usize, value: Logic);
    fn get_sim_time_steps(&self) -> u64;
    fn get_sim_precision(&self) -> i8;
    fn register_callback(&mut self, cb: SimCallback) -> Result<usize, Fault>;
    fn cancel_callback(&mut self, cb_hdl: usize) -> Result<(), Fault>;

    /// Advance the backend by one quantum and hand back the next callback to
    /// deliver, or `None` once no scheduled work remains.
    fn next_reaction(&mut self) -> Option<Reaction>;

    fn get_sim_time(&self, unit: &str) -> f64 {
        // this function does not preserve precision, so don't use carelessly
        let t = self.get_sim_time_steps() as f64;
        let precision = self.get_sim_precision();
        ldexp10(t, precision - time_scale(unit))
    }

    fn get_sim_steps(&self, time: f64, unit: &str) -> u64 {
        let precision = self.get_sim_precision();
        let steps = ldexp10(time, time_scale(unit) - precision);
        if steps % 1.0 == 0.0 {
            steps as u64
        } else {
            panic!(
                "Can't convert time {} {} to sim steps without rounding (sim precision: 1e{})",
                time, unit, precision
            );
        }
    }
}

pub fn install(backend: Box<dyn SimIf>) {
    SIM_IF.with(|s| {
        *s.borrow_mut() = Some(backend);
    });
}

pub fn uninstall() {
    SIM_IF.with(|s| {
        *s.borrow_mut() = None;
    });
}

pub fn is_installed() -> bool {
    SIM_IF.with(|s| s.borrow().is_some())
}

/// Run `f` against the installed backend. Panics when called outside of a
/// running test, which is always a harness bug.
pub fn with<R>(f: impl FnOnce(&mut dyn SimIf) -> R) -> R {
    SIM_IF.with(|s| {
        let mut slot = s.borrow_mut();
        let sim = slot
            .as_mut()
            .expect("no simulation backend installed on this thread");
        f(sim.as_mut())
    })
}

fn time_scale(unit: &str) -> i8 {
    match unit {
        "fs" => -15,
        "ps" => -12,
        "ns" => -9,
        "us" => -6,
        "ms" => -3,
        "sec" => 0,
        _ => panic!("unknown time unit '{}'", unit),
    }
}

fn ldexp10(frac: f64, exp: i8) -> f64 {
    // Like math.ldexp, but base 10.
    if exp >= 0 {
        frac * 10_u64.pow(exp as u32) as f64
    } else {
        let div = 10_u64.pow(-exp as u32) as f64;
        frac / div
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSim;

    #[test]
    fn step_conversion() {
        let sim = EventSim::new();
        // default precision is 1 ps
        assert_eq!(sim.get_sim_precision(), -12);
        assert_eq!(sim.get_sim_steps(1.0, "ns"), 1_000);
        assert_eq!(sim.get_sim_steps(10.0, "us"), 10_000_000_000);
        assert_eq!(sim.get_sim_steps(5.0, "ps"), 5);
    }

    #[test]
    #[should_panic]
    fn sub_precision_time_panics() {
        let sim = EventSim::new();
        sim.get_sim_steps(0.5, "ps");
    }

    #[test]
    fn install_cycle() {
        assert!(!is_installed());
        install(Box::new(EventSim::new()));
        assert!(is_installed());
        let t = with(|s| s.get_sim_time_steps());
        assert_eq!(t, 0);
        uninstall();
        assert!(!is_installed());
    }
}
