//! Fan-out of work over a fixed pool of worker threads.
//!
//! Every worker receives its index and the number of workers, and is expected to process the
//! slice of an index range such that `i % num_threads == this_thread` (see `thread_range`).
//! Workers never write shared state: `execute_collect` gives each one its own bucket, and the
//! buckets are merged after all the workers have joined.
//!
//! Errors and panics raised by a worker are captured; every worker runs to completion and the
//! error of the lowest-indexed failing worker is returned to the caller.

use crate::util::{Error, Result};

use log::debug;
use rayon::prelude::*;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};


/// The indices of `0..len` assigned to worker `this_thread` out of `num_threads`
pub fn thread_range(this_thread: usize, num_threads: usize, len: usize) -> impl Iterator<Item = usize> {
    (this_thread..len).step_by(num_threads.max(1))
}


fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        String::from(*s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("unknown panic payload")
    }
}


/// Run `f`, turning a panic into `Error::WorkerPanic`
fn guarded<T, F: FnOnce() -> Result<T>>(f: F) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(Error::WorkerPanic(panic_message(payload))))
}


fn first_error<T>(results: Vec<Result<T>>) -> Result<Vec<T>> {
    results.into_iter().collect()
}


/// Runs closures over a pool of worker threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadExecutor;


impl ThreadExecutor {

    /// Run `f(this_thread, num_threads)` on `num_threads` workers and wait for all of them.
    ///
    /// # Errors
    /// * `Error::ThreadPool` if the pool cannot be built
    /// * the first error (or `Error::WorkerPanic`) raised by a worker
    pub fn execute<F>(num_threads: usize, f: F) -> Result<()>
    where
        F: Fn(usize, usize) -> Result<()> + Sync
    {
        first_error(Self::run(num_threads, &f)?).map(|_| ())
    }

    /// Run `f(this_thread, num_threads, bucket)` on `num_threads` workers, each one pushing its
    /// results into its own bucket. The buckets are concatenated in worker order once every
    /// worker has finished.
    ///
    /// # Errors
    /// * `Error::ThreadPool` if the pool cannot be built
    /// * the first error (or `Error::WorkerPanic`) raised by a worker
    pub fn execute_collect<T, F>(num_threads: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize, usize, &mut Vec<T>) -> Result<()> + Sync
    {
        let buckets = Self::run(num_threads, &|this_thread, n| {
            let mut bucket = Vec::new();
            f(this_thread, n, &mut bucket)?;
            Ok(bucket)
        })?;

        Ok(first_error(buckets)?.into_iter().flatten().collect())
    }

    /// Run `f` on every worker. If some worker fails, run `undo(this_thread, num_threads)` on the
    /// workers whose `f` succeeded, to restore the state preceding the call.
    ///
    /// # Errors
    /// * `Error::ThreadPool` if the pool cannot be built
    /// * the first error raised by an `undo`, if any, otherwise the first error raised by `f`
    pub fn execute_or_undo<F, U>(num_threads: usize, f: F, undo: U) -> Result<()>
    where
        F: Fn(usize, usize) -> Result<()> + Sync,
        U: Fn(usize, usize) -> Result<()> + Sync
    {
        let results = Self::run(num_threads, &f)?;
        let failure = match results.iter().find_map(|r| r.as_ref().err()) {
            Some(e) => e.clone(),
            None => return Ok(())
        };

        let succeeded: Vec<bool> = results.iter().map(|r| r.is_ok()).collect();
        debug!("a worker failed ({}), undoing {} workers", failure, succeeded.iter().filter(|&&s| s).count());

        let undone = Self::run(num_threads, &|this_thread, n| {
            if succeeded[this_thread] {
                undo(this_thread, n)
            } else {
                Ok(())
            }
        })?;

        first_error(undone)?;
        Err(failure)
    }

    fn run<T, F>(num_threads: usize, f: &F) -> Result<Vec<Result<T>>>
    where
        T: Send,
        F: Fn(usize, usize) -> Result<T> + Sync
    {
        let n = num_threads.max(1);
        if n == 1 {
            return Ok(vec![guarded(|| f(0, 1))]);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        Ok(pool.install(|| {
            (0..n).into_par_iter()
                  .map(|this_thread| guarded(|| f(this_thread, n)))
                  .collect()
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ranges_are_disjoint() {
        let mut seen: Vec<usize> = (0..3).flat_map(|t| thread_range(t, 3, 10)).collect();
        seen.sort();
        assert_eq!((0..10).collect::<Vec<_>>(), seen);
        assert_eq!(vec![1, 4, 7], thread_range(1, 3, 10).collect::<Vec<_>>());
    }

    #[test]
    fn every_worker_runs() {
        let count = AtomicUsize::new(0);
        ThreadExecutor::execute(4, |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }).unwrap();
        assert_eq!(4, count.load(Ordering::SeqCst));
    }

    #[test]
    fn collect_in_worker_order() {
        let values = ThreadExecutor::execute_collect(3, |t, n, bucket| {
            bucket.extend(thread_range(t, n, 9).map(|i| i * i));
            Ok(())
        }).unwrap();

        let mut sorted = values.clone();
        sorted.sort();
        assert_eq!(vec![0, 1, 4, 9, 16, 25, 36, 49, 64], sorted);
        assert_eq!(vec![0, 9, 36], values[..3].to_vec());
    }

    #[test]
    fn first_error_wins_and_all_run() {
        let count = AtomicUsize::new(0);
        let res = ThreadExecutor::execute(4, |t, _| {
            count.fetch_add(1, Ordering::SeqCst);
            if t >= 2 {
                Err(Error::InvalidArgument(format!("worker {}", t)))
            } else {
                Ok(())
            }
        });

        assert_eq!(Err(Error::InvalidArgument(String::from("worker 2"))), res);
        assert_eq!(4, count.load(Ordering::SeqCst));
    }

    #[test]
    fn panics_are_captured() {
        let res = ThreadExecutor::execute(2, |t, _| {
            if t == 1 {
                panic!("boom");
            }
            Ok(())
        });
        assert_eq!(Err(Error::WorkerPanic(String::from("boom"))), res);
    }

    #[test]
    fn undo_successful_workers() {
        let done = AtomicUsize::new(0);
        let undone = AtomicUsize::new(0);

        let res = ThreadExecutor::execute_or_undo(
            3,
            |t, _| {
                if t == 0 {
                    return Err(Error::OperationNotAllowed(String::from("first")));
                }
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            |_, _| {
                undone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        );

        assert!(res.is_err());
        assert_eq!(2, done.load(Ordering::SeqCst));
        assert_eq!(2, undone.load(Ordering::SeqCst));

        let clean = ThreadExecutor::execute_or_undo(2, |_, _| Ok(()), |_, _| {
            undone.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });
        assert!(clean.is_ok());
        assert_eq!(2, undone.load(Ordering::SeqCst));
    }
}
