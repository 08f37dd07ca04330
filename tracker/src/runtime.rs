//! Scheduling seam: where tasks run, how they wait and what time it is.
//!
//! Everything the tracker spawns is `!Send` and runs on one thread, like the
//! browser event loop it was written for.

use futures_util::future::LocalBoxFuture;
use std::time::Duration;

pub trait Runtime {
    /// Runs `task` to completion in the background on the current thread.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;

    /// Monotonic clock reading. Only differences between readings matter.
    fn now(&self) -> Duration;
}

#[cfg(not(target_arch = "wasm32"))]
pub use self::tokio_runtime::TokioRuntime;

#[cfg(not(target_arch = "wasm32"))]
mod tokio_runtime {
    use super::Runtime;
    use futures_util::future::LocalBoxFuture;
    use futures_util::FutureExt;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Runtime backed by tokio's current-thread scheduler.
    ///
    /// Tasks go through `tokio::task::spawn_local`, so the tracker must be
    /// driven from inside a `tokio::task::LocalSet`. Time comes from
    /// `tokio::time`, which makes paused test clocks work unchanged.
    #[derive(Clone, Debug)]
    pub struct TokioRuntime {
        epoch: Instant,
    }

    impl TokioRuntime {
        pub fn new() -> Self {
            Self {
                epoch: Instant::now(),
            }
        }
    }

    impl Default for TokioRuntime {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Runtime for TokioRuntime {
        fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
            tokio::task::spawn_local(task);
        }

        fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
            tokio::time::sleep(duration).boxed_local()
        }

        fn now(&self) -> Duration {
            self.epoch.elapsed()
        }
    }
}
