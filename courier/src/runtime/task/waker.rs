use crate::runtime::task::Task;

use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Builds a [`Waker`] that reschedules `task` onto its run queue.
///
/// The raw pointer carried by the waker is an `Arc<Task<T>>` turned
/// inside out with `Arc::into_raw`; every vtable entry below keeps the
/// strong count balanced.
pub(crate) fn make_waker<T: Send + 'static>(task: Arc<Task<T>>) -> Waker {
    let raw = RawWaker::new(Arc::into_raw(task).cast::<()>(), TaskWaker::<T>::VTABLE);

    unsafe { Waker::from_raw(raw) }
}

struct TaskWaker<T>(std::marker::PhantomData<T>);

impl<T: Send + 'static> TaskWaker<T> {
    const VTABLE: &'static RawWakerVTable =
        &RawWakerVTable::new(Self::clone, Self::wake, Self::wake_by_ref, Self::drop);

    unsafe fn clone(ptr: *const ()) -> RawWaker {
        unsafe { Arc::increment_strong_count(ptr.cast::<Task<T>>()) };

        RawWaker::new(ptr, Self::VTABLE)
    }

    unsafe fn wake(ptr: *const ()) {
        let task = unsafe { Arc::from_raw(ptr.cast::<Task<T>>()) };
        task.wake();
    }

    unsafe fn wake_by_ref(ptr: *const ()) {
        unsafe { Arc::increment_strong_count(ptr.cast::<Task<T>>()) };
        let task = unsafe { Arc::from_raw(ptr.cast::<Task<T>>()) };
        task.wake();
    }

    unsafe fn drop(ptr: *const ()) {
        unsafe { Arc::decrement_strong_count(ptr.cast::<Task<T>>()) };
    }
}
