use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

// TbObj lets testbench tasks mutably share objects (backlogs, scoreboards,
// recorded stimulus, ...). The simulation is single threaded, so Rc/RefCell
// is sufficient; Send/Sync are asserted below only to satisfy the executor's
// future bounds.
pub struct TbObj<T>(Rc<RefCell<T>>);

impl<T> TbObj<T> {
    pub fn new(data: T) -> TbObj<T> {
        TbObj(Rc::new(RefCell::new(data)))
    }

    pub fn get(&self) -> Ref<'_, T> {
        (*self.0).borrow()
    }

    pub fn get_mut(&self) -> RefMut<'_, T> {
        (*self.0).borrow_mut()
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.get_mut())
    }
}

impl<T> Clone for TbObj<T> {
    fn clone(&self) -> Self {
        TbObj(self.0.clone())
    }
}

// All tasks holding a TbObj run on the thread that owns the simulation, so
// no reference ever crosses a thread boundary.
unsafe impl<T> Send for TbObj<T> {}
unsafe impl<T> Sync for TbObj<T> {}
