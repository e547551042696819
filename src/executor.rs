use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use futures::task::{waker_ref, ArcWake, Context, Poll};
use futures_channel::oneshot;
use log::trace;
use queues::{IsQueue, Queue};

use crate::fault::Fault;
use crate::TbResult;

thread_local! {
    static READY_QUEUE: RefCell<Queue<Arc<Task>>> = RefCell::new(Queue::new());
}

pub(crate) fn schedule_task(task: Arc<Task>) {
    READY_QUEUE.with(|q| {
        q.borrow_mut().add(task).expect("Error queueing task.");
    });
}

fn next_task() -> Option<Arc<Task>> {
    READY_QUEUE.with(|q| q.borrow_mut().remove().ok())
}

#[inline]
pub(crate) fn run_once() {
    while let Some(task) = next_task() {
        process_task(task);
    }
}

pub(crate) fn clear_ready_queue() {
    READY_QUEUE.with(|q| {
        *q.borrow_mut() = Queue::new();
    });
}

#[inline]
fn process_task(task: Arc<Task>) {
    if *task.state.lock().unwrap() == TaskState::Cancelled {
        // never poll a cancelled task; it is dropped once all references
        // disappear
        return;
    }

    let mut fut_slot = task.future.lock().unwrap();
    if let Some(mut fut) = fut_slot.take() {
        let waker = waker_ref(&task);
        let context = &mut Context::from_waker(&waker);
        let result = match fut.as_mut().poll(context) {
            Poll::Pending => {
                *fut_slot = Some(fut);
                None
            }
            Poll::Ready(result) => Some(result),
        };
        if let Some(result) = result {
            trace!("task {:?} complete", task.name);
            let mut tx_slot = task.join_tx.lock().unwrap();
            let _ = tx_slot.take().unwrap().send(result);
        }
    } else {
        panic!("Scheduled completed or uninitialized task.");
    }
}

#[derive(PartialEq)]
enum TaskState {
    Pending,
    Cancelled,
}

/// A cooperatively scheduled testbench task.
pub struct Task {
    future: Mutex<Option<BoxFuture<'static, TbResult>>>,
    state: Mutex<TaskState>,
    name: Option<String>,
    join_tx: Mutex<Option<oneshot::Sender<TbResult>>>,
}

impl Task {
    pub fn fork(future: impl Future<Output = TbResult> + Send + 'static) -> JoinHandle {
        Task::spawn_from_future(future, "forked")
    }

    pub fn spawn_from_future(
        future: impl Future<Output = TbResult> + Send + 'static,
        name: &str,
    ) -> JoinHandle {
        let (task, join_handle) = Task::new(future.boxed(), name);
        schedule_task(task);
        join_handle
    }

    fn new(fut: BoxFuture<'static, TbResult>, name: &str) -> (Arc<Self>, JoinHandle) {
        let (tx, join_handle) = new_join();
        let task = Self {
            future: Mutex::new(Some(fut)),
            state: Mutex::new(TaskState::Pending),
            name: Some(name.to_string()),
            join_tx: Mutex::new(Some(tx)),
        };
        let arc_task = Arc::new(task);
        let join_handle = join_handle.set_task(arc_task.clone());
        (arc_task, join_handle)
    }

    pub(crate) fn cancel(&self) {
        // the executor drops the task without polling it again
        *self.state.lock().unwrap() = TaskState::Cancelled;
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        schedule_task(arc_self.clone());
    }
}

fn new_join() -> (oneshot::Sender<TbResult>, JoinHandle) {
    let (tx, rx) = oneshot::channel::<TbResult>();
    (
        tx,
        JoinHandle {
            join_rx: rx,
            awaited_task: None,
        },
    )
}

pub struct JoinHandle {
    awaited_task: Option<Arc<Task>>,
    join_rx: oneshot::Receiver<TbResult>,
}

impl JoinHandle {
    fn set_task(mut self, task: Arc<Task>) -> Self {
        self.awaited_task.replace(task);
        self
    }

    /// Cancel the task outright. It is never polled again, so any suspended
    /// wait is abandoned and no further side effect can occur.
    pub fn cancel(mut self) {
        let task = self.awaited_task.take().expect("Task already cancelled.");
        task.cancel();
    }

    /// Non-blocking completion check, used by the event loop for the
    /// top-level test task.
    pub(crate) fn try_result(&mut self) -> Option<TbResult> {
        match self.join_rx.try_recv() {
            Ok(Some(result)) => Some(result),
            _ => None,
        }
    }
}

impl Future for JoinHandle {
    type Output = TbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Fault::lifecycle(
                "awaited task was cancelled before completion",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Val;

    #[test]
    fn spawned_task_runs_to_completion() {
        clear_ready_queue();
        let mut handle = Task::fork(async { Ok(Val::Int(7)) });
        assert!(handle.try_result().is_none());
        run_once();
        assert_eq!(handle.try_result(), Some(Ok(Val::Int(7))));
    }

    #[test]
    fn cancelled_task_is_never_polled() {
        clear_ready_queue();
        let flag = crate::tb_obj::TbObj::new(false);
        let f = flag.clone();
        let handle = Task::fork(async move {
            *f.get_mut() = true;
            Ok(Val::None)
        });
        handle.cancel();
        run_once();
        assert!(!*flag.get());
    }

    #[test]
    fn tasks_run_in_spawn_order() {
        clear_ready_queue();
        let order = crate::tb_obj::TbObj::new(Vec::new());
        for i in 0..3 {
            let o = order.clone();
            Task::fork(async move {
                o.get_mut().push(i);
                Ok(Val::None)
            });
        }
        run_once();
        assert_eq!(*order.get(), vec![0, 1, 2]);
    }
}
