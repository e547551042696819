//! Bundled discrete-event kernel.
//!
//! Single threaded, delta-cycle based. Signal writes are deferred
//! (non-blocking-assignment style) and committed between task waves, so all
//! tasks woken at one edge observe the same stable snapshot. Within one
//! timestep the order is: value-change commits (with edge delivery), then
//! the read-write phase, then the read-only phase; only when a timestep has
//! fully settled does time advance to the earliest pending timer.

use std::collections::{BTreeMap, HashMap, VecDeque};

use intmap::IntMap;
use log::trace;

use crate::fault::Fault;
use crate::sim_if::{Reaction, SimCallback, SimIf};
use crate::trigger::EdgeKind;
use crate::value::Logic;

struct SignalRec {
    name: String,
    width: u32,
    value: Logic,
}

pub struct EventSim {
    time: u64,
    precision: i8,
    signals: Vec<SignalRec>,
    names: HashMap<String, usize>,
    // committed between task waves, in write order
    nba_queue: VecDeque<(usize, Logic)>,
    next_cb_hdl: u64,
    cb_kinds: IntMap<SimCallback>,
    edge_cbs: IntMap<u64>,
    timer_cbs: BTreeMap<u64, u64>,
    rw_cb: Option<u64>,
    ro_cb: Option<u64>,
}

impl EventSim {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            time: 0,
            precision: -12,
            signals: Vec::new(),
            names: HashMap::new(),
            nba_queue: VecDeque::new(),
            next_cb_hdl: 1,
            cb_kinds: IntMap::new(),
            edge_cbs: IntMap::new(),
            timer_cbs: BTreeMap::new(),
            rw_cb: None,
            ro_cb: None,
        }
    }

    fn new_cb_hdl(&mut self, cb: SimCallback) -> u64 {
        let hdl = self.next_cb_hdl;
        self.next_cb_hdl += 1;
        self.cb_kinds.insert(hdl, cb);
        hdl
    }

    fn edge_of(old: Logic, new: Logic, width: u32) -> EdgeKind {
        if width == 1 {
            if new.is_high() && !old.is_high() {
                return EdgeKind::Rising;
            }
            if new.is_low() && !old.is_low() {
                return EdgeKind::Falling;
            }
        }
        EdgeKind::Any
    }
}

impl SimIf for EventSim {
    fn add_signal(&mut self, name: &str, width: u32) -> usize {
        assert!(
            (1..=64).contains(&width),
            "signal '{}': width {} not supported",
            name,
            width
        );
        assert!(
            !self.names.contains_key(name),
            "signal '{}' already exists",
            name
        );
        let handle = self.signals.len();
        self.signals.push(SignalRec {
            name: name.to_string(),
            width,
            value: Logic::X,
        });
        self.names.insert(name.to_string(), handle);
        handle
    }

    fn get_handle_by_name(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    fn get_full_name(&self, handle: usize) -> Result<String, Fault> {
        self.signals
            .get(handle)
            .map(|s| s.name.clone())
            .ok_or_else(|| Fault::lifecycle(format!("unknown signal handle {}", handle)))
    }

    fn get_size(&self, handle: usize) -> u32 {
        self.signals[handle].width
    }

    fn get_value(&self, handle: usize) -> Logic {
        self.signals[handle].value
    }

    fn set_value(&mut self, handle: usize, value: Logic) {
        self.nba_queue.push_back((handle, value));
    }

    fn get_sim_time_steps(&self) -> u64 {
        self.time
    }

    fn get_sim_precision(&self) -> i8 {
        self.precision
    }

    fn register_callback(&mut self, cb: SimCallback) -> Result<usize, Fault> {
        let hdl = match cb {
            SimCallback::Time(delta) => {
                let abs = self.time + delta;
                let hdl = self.new_cb_hdl(SimCallback::Time(abs));
                self.timer_cbs.insert(abs, hdl);
                hdl
            }
            SimCallback::Edge(sig_hdl) => {
                if self.edge_cbs.contains_key(sig_hdl as u64) {
                    return Err(Fault::lifecycle(format!(
                        "edge callback already registered for signal {}",
                        sig_hdl
                    )));
                }
                let hdl = self.new_cb_hdl(cb);
                self.edge_cbs.insert(sig_hdl as u64, hdl);
                hdl
            }
            SimCallback::ReadWrite => {
                let hdl = self.new_cb_hdl(cb);
                self.rw_cb = Some(hdl);
                hdl
            }
            SimCallback::ReadOnly => {
                let hdl = self.new_cb_hdl(cb);
                self.ro_cb = Some(hdl);
                hdl
            }
        };
        Ok(hdl as usize)
    }

    fn cancel_callback(&mut self, cb_hdl: usize) -> Result<(), Fault> {
        let cb = self
            .cb_kinds
            .remove(cb_hdl as u64)
            .ok_or_else(|| Fault::lifecycle(format!("unknown callback handle {}", cb_hdl)))?;
        match cb {
            SimCallback::Time(abs) => {
                self.timer_cbs.remove(&abs);
            }
            SimCallback::Edge(sig_hdl) => {
                self.edge_cbs.remove(sig_hdl as u64);
            }
            SimCallback::ReadWrite => self.rw_cb = None,
            SimCallback::ReadOnly => self.ro_cb = None,
        }
        Ok(())
    }

    fn next_reaction(&mut self) -> Option<Reaction> {
        loop {
            // settle pending writes first; each commit may fire an edge
            if let Some((handle, new)) = self.nba_queue.pop_front() {
                let old = self.signals[handle].value;
                if old == new {
                    continue;
                }
                let width = self.signals[handle].width;
                self.signals[handle].value = new;
                trace!(
                    "t={} commit {} <- {}",
                    self.time,
                    self.signals[handle].name,
                    new
                );
                if self.edge_cbs.contains_key(handle as u64) {
                    let edge = Self::edge_of(old, new, width);
                    return Some(Reaction {
                        cb: SimCallback::Edge(handle),
                        edge: Some(edge),
                    });
                }
                continue;
            }
            if let Some(hdl) = self.rw_cb.take() {
                self.cb_kinds.remove(hdl);
                return Some(Reaction {
                    cb: SimCallback::ReadWrite,
                    edge: None,
                });
            }
            if let Some(hdl) = self.ro_cb.take() {
                self.cb_kinds.remove(hdl);
                return Some(Reaction {
                    cb: SimCallback::ReadOnly,
                    edge: None,
                });
            }
            // timestep settled, advance to the earliest timer
            if let Some((&abs, &hdl)) = self.timer_cbs.iter().next() {
                self.timer_cbs.remove(&abs);
                self.cb_kinds.remove(hdl);
                debug_assert!(abs >= self.time);
                self.time = abs;
                return Some(Reaction {
                    cb: SimCallback::Time(abs),
                    edge: None,
                });
            }
            return None;
        }
    }
}
