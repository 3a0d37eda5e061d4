//! Runtime abstraction layer for async operations
//!
//! Data loads are fire-and-forget: every spawned task reports back over
//! a crossbeam channel, so the spawner seam only needs a handle for
//! liveness checks and cancellation.

use crate::prelude::{Future, Pin};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience function for spawning with type safety
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::trace!("runtime::spawn() - spawning async task");
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::task::JoinHandle;

        /// Tokio-based async spawner
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Box<dyn AsyncHandle> {
                let handle = ::tokio::spawn(future);
                Box::new(TokioHandle(handle))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }

    #[cfg(feature = "wasm")]
    pub mod wasm {
        use super::*;
        use crate::prelude::Arc;
        use std::sync::Mutex;

        /// WASM-compatible async spawner
        pub struct WasmSpawner;

        impl AsyncSpawner for WasmSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Box<dyn AsyncHandle> {
                wasm_bindgen_futures::spawn_local(future);
                Box::new(WasmHandle {
                    finished: Arc::new(Mutex::new(false)),
                })
            }
        }

        struct WasmHandle {
            finished: Arc<Mutex<bool>>,
        }

        impl AsyncHandle for WasmHandle {
            fn is_finished(&self) -> bool {
                self.finished.lock().map(|f| *f).unwrap_or(true)
            }

            fn cancel(&self) {
                // WASM tasks can't be cancelled easily, just mark as finished
                if let Ok(mut finished) = self.finished.lock() {
                    *finished = true;
                }
            }
        }
    }
}

/// Async utilities shared across the engine
pub mod async_utils {
    /// Unified async delay function that works across runtimes
    pub async fn async_delay(duration: std::time::Duration) {
        #[cfg(feature = "tokio-runtime")]
        {
            tokio::time::sleep(duration).await;
        }

        #[cfg(not(feature = "tokio-runtime"))]
        {
            // Use a simple async delay that doesn't block
            let start = instant::Instant::now();
            while start.elapsed() < duration {
                std::hint::spin_loop();
            }
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    let _ = RUNTIME.set(spawner);
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner)
            }

            #[cfg(all(feature = "wasm", not(feature = "tokio-runtime")))]
            {
                Box::new(spawners::wasm::WasmSpawner)
            }

            #[cfg(not(any(feature = "tokio-runtime", feature = "wasm")))]
            {
                panic!("No async runtime available. Enable 'tokio-runtime' or 'wasm' feature.");
            }
        })
        .as_ref()
}
