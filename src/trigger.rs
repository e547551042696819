use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use intmap::IntMap;

use crate::executor;
use crate::signal::SimObject;
use crate::sim_if::{self, SimCallback};
use crate::value::Val;

thread_local! {
    // key is signal handle
    static EDGE_MAP: RefCell<IntMap<CallbackHandles>> = RefCell::new(IntMap::new());
    // key is absolute callback time
    static TIMER_MAP: RefCell<IntMap<CallbackHandles>> = RefCell::new(IntMap::new());
    static READ_ONLY: RefCell<CallbackHandles> = RefCell::new(CallbackHandles::empty());
    static READ_WRITE: RefCell<CallbackHandles> = RefCell::new(CallbackHandles::empty());
}

struct CallbackHandles {
    handle: Option<usize>,
    callbacks: VecDeque<TrigShared>,
}

impl CallbackHandles {
    fn empty() -> Self {
        Self {
            handle: None,
            callbacks: VecDeque::new(),
        }
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum EdgeKind {
    Any,
    Rising,
    Falling,
}

/// Drop all pending waits. Their wakers (and through them the suspended
/// tasks) go with them; the backend is discarded wholesale by the runner, so
/// backend-side callback registrations need no individual cancellation.
pub(crate) fn clear_all_triggers() {
    EDGE_MAP.with(|m| m.borrow_mut().clear());
    TIMER_MAP.with(|m| m.borrow_mut().clear());
    READ_ONLY.with(|c| *c.borrow_mut() = CallbackHandles::empty());
    READ_WRITE.with(|c| *c.borrow_mut() = CallbackHandles::empty());
}

#[derive(Debug, Clone)]
struct TrigShared {
    waker: Waker,
    // If the trigger is an edge, react() needs to know which polarity was
    // awaited so an existing callback does not have to be rescheduled.
    edge_kind: EdgeKind,
}

#[derive(Clone)]
enum TrigKind {
    Edge(usize, EdgeKind),
    Timer(u64),
    ReadWrite,
    ReadOnly,
}

/// A one-shot awaitable suspension point: next edge, timer expiry or
/// simulation phase.
#[derive(Clone)]
pub struct Trigger {
    kind: TrigKind,
    awaited: bool,
}

impl Trigger {
    pub fn timer(time: u64, unit: &str) -> Self {
        Trigger {
            kind: TrigKind::Timer(sim_if::with(|s| s.get_sim_steps(time as f64, unit))),
            awaited: false,
        }
    }

    pub fn timer_steps(steps: u64) -> Self {
        Trigger {
            kind: TrigKind::Timer(steps),
            awaited: false,
        }
    }

    pub fn edge(signal: SimObject) -> Self {
        Trigger {
            kind: TrigKind::Edge(signal.handle(), EdgeKind::Any),
            awaited: false,
        }
    }

    pub fn rising_edge(signal: SimObject) -> Self {
        Trigger {
            kind: TrigKind::Edge(signal.handle(), EdgeKind::Rising),
            awaited: false,
        }
    }

    pub fn falling_edge(signal: SimObject) -> Self {
        Trigger {
            kind: TrigKind::Edge(signal.handle(), EdgeKind::Falling),
            awaited: false,
        }
    }

    pub fn read_write() -> Self {
        Trigger {
            kind: TrigKind::ReadWrite,
            awaited: false,
        }
    }

    pub fn read_only() -> Self {
        Trigger {
            kind: TrigKind::ReadOnly,
            awaited: false,
        }
    }
}

impl Future for Trigger {
    type Output = Val;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A trigger is only awaited once, so the second poll must mean the
        // waker signalled completion.
        if self.awaited {
            return Poll::Ready(Val::None);
        }
        self.awaited = true;
        let mut shared = TrigShared {
            waker: cx.waker().clone(),
            edge_kind: EdgeKind::Any,
        };

        match self.kind {
            TrigKind::ReadWrite => READ_WRITE.with(|c| {
                let mut c = c.borrow_mut();
                c.callbacks.push_back(shared);
                if c.handle.is_none() {
                    let cb_hdl = sim_if::with(|s| s.register_callback(SimCallback::ReadWrite))
                        .expect("failed to register read-write callback");
                    c.handle.replace(cb_hdl);
                }
            }),
            TrigKind::ReadOnly => READ_ONLY.with(|c| {
                let mut c = c.borrow_mut();
                c.callbacks.push_back(shared);
                if c.handle.is_none() {
                    let cb_hdl = sim_if::with(|s| s.register_callback(SimCallback::ReadOnly))
                        .expect("failed to register read-only callback");
                    c.handle.replace(cb_hdl);
                }
            }),
            TrigKind::Timer(t) => {
                // key on absolute time, since the backend reports back
                // absolute time rather than the delta
                let abs_time = t + sim_if::with(|s| s.get_sim_time_steps());
                TIMER_MAP.with(|m| {
                    let mut m = m.borrow_mut();
                    if let Some(callbacks) = m.get_mut(abs_time) {
                        callbacks.callbacks.push_back(shared);
                    } else {
                        let handle = sim_if::with(|s| s.register_callback(SimCallback::Time(t)))
                            .expect("failed to register timer callback");
                        let mut vec = VecDeque::new();
                        vec.push_back(shared);
                        m.insert(
                            abs_time,
                            CallbackHandles {
                                handle: Some(handle),
                                callbacks: vec,
                            },
                        );
                    }
                });
            }
            TrigKind::Edge(sig_hdl, edge_kind) => {
                shared.edge_kind = edge_kind;
                EDGE_MAP.with(|m| {
                    let mut m = m.borrow_mut();
                    if let Some(callbacks) = m.get_mut(sig_hdl as u64) {
                        callbacks.callbacks.push_back(shared);
                    } else {
                        let handle = sim_if::with(|s| s.register_callback(SimCallback::Edge(sig_hdl)))
                            .expect("failed to register edge callback");
                        let mut vec = VecDeque::new();
                        vec.push_back(shared);
                        m.insert(
                            sig_hdl as u64,
                            CallbackHandles {
                                handle: Some(handle),
                                callbacks: vec,
                            },
                        );
                    }
                });
            }
        }
        Poll::Pending
    }
}

/// Deliver a fired backend callback: wake every matching waiter, then run
/// the executor so woken tasks make progress before the next callback.
#[inline]
pub(crate) fn react(cb: SimCallback, edge: Option<EdgeKind>) {
    let mut vec_wake: Option<VecDeque<TrigShared>> = None;

    match cb {
        SimCallback::ReadWrite => READ_WRITE.with(|c| {
            let mut c = c.borrow_mut();
            c.handle = None; // the callback is done
            if !c.callbacks.is_empty() {
                vec_wake = Some(std::mem::take(&mut c.callbacks));
            } else {
                panic!("Did not expect ReadWrite callback");
            }
        }),
        SimCallback::ReadOnly => READ_ONLY.with(|c| {
            let mut c = c.borrow_mut();
            c.handle = None;
            if !c.callbacks.is_empty() {
                vec_wake = Some(std::mem::take(&mut c.callbacks));
            } else {
                panic!("Did not expect ReadOnly callback");
            }
        }),
        SimCallback::Time(t) => {
            if let Some(callbacks) = TIMER_MAP.with(|m| m.borrow_mut().remove(t)) {
                vec_wake = Some(callbacks.callbacks);
            } else {
                panic!("Did not expect Timer callback: t={}", t);
            }
        }
        SimCallback::Edge(sig_hdl) => {
            let callbacks = EDGE_MAP.with(|m| m.borrow_mut().remove(sig_hdl as u64));
            if let Some(mut callbacks) = callbacks {
                let edge = edge.unwrap();
                match edge {
                    EdgeKind::Any => {
                        // every waiter matches, so the backend callback can go
                        sim_if::with(|s| s.cancel_callback(callbacks.handle.unwrap()))
                            .expect("failed to cancel edge callback");
                        vec_wake = Some(std::mem::take(&mut callbacks.callbacks));
                    }
                    _ => {
                        let mut vec_resched: VecDeque<TrigShared> = VecDeque::new();
                        let mut vec_wake_tmp: VecDeque<TrigShared> = VecDeque::new();
                        for trig in callbacks.callbacks.drain(..) {
                            if trig.edge_kind == EdgeKind::Any || trig.edge_kind == edge {
                                vec_wake_tmp.push_back(trig);
                            } else {
                                vec_resched.push_back(trig);
                            }
                        }
                        if vec_resched.is_empty() {
                            // no waiters remain, drop the backend callback
                            sim_if::with(|s| s.cancel_callback(callbacks.handle.unwrap()))
                                .expect("failed to cancel edge callback");
                        } else {
                            // put rescheduled waiters back, keeping the
                            // existing backend callback alive
                            callbacks.callbacks = vec_resched;
                            EDGE_MAP.with(|m| {
                                m.borrow_mut().insert(sig_hdl as u64, callbacks);
                            });
                        }
                        if !vec_wake_tmp.is_empty() {
                            vec_wake = Some(vec_wake_tmp);
                        }
                    }
                }
            } else {
                panic!("Did not expect Edge callback: sig_hdl={}", sig_hdl);
            }
        }
    }

    if let Some(vec_wake) = vec_wake {
        for shared in vec_wake {
            shared.waker.wake();
        }
        // execute woken tasks
        executor::run_once();
    }
}
