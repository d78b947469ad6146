//! Worker pool selection.

/// Run `op` on a rayon pool with `threads` workers.
///
/// Zero threads uses the global pool. If a dedicated pool cannot be built the
/// work runs on the global pool as well.
pub fn with_thread_pool<R: Send>(threads: usize, op: impl FnOnce() -> R + Send) -> R {
    if threads == 0 {
        return op();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(op),
        Err(err) => {
            tracing::warn!(
                threads,
                error = %err,
                "could not build worker pool, using the global pool"
            );
            op()
        }
    }
}
