use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::domain::error::{EngineError, EngineResult};

/// Run `f`, turning a panic into [`EngineError::Panic`] so it never crosses
/// the FFI boundary.
pub fn catch_panics<F, T>(what: &str, f: F) -> EngineResult<T>
where
  F: FnOnce() -> EngineResult<T>,
{
  match catch_unwind(AssertUnwindSafe(f)) {
    Ok(r) => r,
    Err(payload) => Err(EngineError::Panic(format!("{what} panicked: {}", panic_message(&*payload)))),
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.as_str()
  } else {
    "unknown panic payload"
  }
}
