//! promise-dispatch: lifecycle notifications for async work in Redux-style stores
//!
//! Dispatch an action carrying an operation and the middleware forwards a
//! start notification, runs the operation, then forwards success or error.
//! Global hooks observe every notification; debouncing coalesces bursts.
//!
//! # Example
//! ```ignore
//! use promise_dispatch::prelude::*;
//!
//! let middleware = PromiseMiddleware::with_config(
//!     Config::default()
//!         .with_operation_field("request")
//!         .with_hook(GlobalHook::on(Matcher::glob("*_ERROR"), |n| {
//!             tracing::warn!(?n, "request failed");
//!         })),
//! );
//! ```

// Re-export everything from core
pub use promise_dispatch_core::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use promise_dispatch_core::prelude::*;

    // Testing
    pub use promise_dispatch_core::testing::{CallLog, TestHarness, TestStore};
    pub use promise_dispatch_core::{
        assert_forwarded, assert_not_forwarded, count_forwarded, find_forwarded,
    };
}
