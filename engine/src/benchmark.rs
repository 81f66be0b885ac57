//! Wall clock measurements of algorithm runs.

use std::sync::atomic::{compiler_fence, Ordering::SeqCst};
use std::time::{Duration, Instant};

/// Run `f` and return its result together with the time it took.
pub fn measure<Out, F: FnOnce() -> Out>(f: F) -> (Out, Duration) {
    compiler_fence(SeqCst);
    let start = Instant::now();
    let res = f();
    let t_passed = start.elapsed();
    compiler_fence(SeqCst);
    (res, t_passed)
}
