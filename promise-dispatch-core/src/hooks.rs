//! Global hooks
//!
//! Hooks registered in [`Config::hooks`](crate::Config::hooks) observe every
//! notification the middleware emits. A hook is either unconditional or
//! guarded by a [`Matcher`] and an optional exclude matcher.
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch::{action_types, GlobalHook, Matcher};
//!
//! let hooks = vec![
//!     // every notification
//!     GlobalHook::always(|n| tracing::info!(?n, "notification")),
//!     // any finished *_USER* request except logouts
//!     GlobalHook::on(Matcher::glob("*USER*"), refresh_profile)
//!         .excluding("LOGOUT_SUCCESS"),
//!     // errors only
//!     GlobalHook::on(action_types::ERROR, report),
//! ];
//! ```

use std::sync::Arc;

use crate::action::{Action, Stage};
use crate::matcher::{self, Matcher};
use crate::value::Callback;

/// A globally registered observer.
#[derive(Clone, Debug)]
pub enum GlobalHook {
    /// Invoked for every notification at every stage.
    Always(Callback),
    /// Invoked when the matchers accept the notification.
    Matched {
        /// Accept matcher. Without one, only `exclude` decides.
        matcher: Option<Matcher>,
        /// Exclude matcher; a match rejects.
        exclude: Option<Matcher>,
        /// Observer to invoke.
        hook: Callback,
    },
}

impl GlobalHook {
    /// Hook receiving every notification.
    pub fn always<F>(f: F) -> Self
    where
        F: Fn(&Action) + Send + Sync + 'static,
    {
        GlobalHook::Always(Callback::new(f))
    }

    /// Hook receiving notifications accepted by `matcher`.
    pub fn on<F>(matcher: impl Into<Matcher>, f: F) -> Self
    where
        F: Fn(&Action) + Send + Sync + 'static,
    {
        GlobalHook::Matched {
            matcher: Some(matcher.into()),
            exclude: None,
            hook: Callback::new(f),
        }
    }

    /// Hook receiving every notification not accepted by `exclude`.
    pub fn except<F>(exclude: impl Into<Matcher>, f: F) -> Self
    where
        F: Fn(&Action) + Send + Sync + 'static,
    {
        GlobalHook::Matched {
            matcher: None,
            exclude: Some(exclude.into()),
            hook: Callback::new(f),
        }
    }

    /// Add an exclude matcher.
    ///
    /// An unconditional hook becomes "everything except `exclude`".
    pub fn excluding(self, exclude: impl Into<Matcher>) -> Self {
        match self {
            GlobalHook::Always(hook) => GlobalHook::Matched {
                matcher: None,
                exclude: Some(exclude.into()),
                hook,
            },
            GlobalHook::Matched { matcher, hook, .. } => GlobalHook::Matched {
                matcher,
                exclude: Some(exclude.into()),
                hook,
            },
        }
    }

    /// Whether this hook applies to the notification.
    pub fn accepts(&self, stage: Stage, notification: &Action) -> bool {
        match self {
            GlobalHook::Always(_) => true,
            GlobalHook::Matched {
                matcher, exclude, ..
            } => matcher::accepts(matcher.as_ref(), exclude.as_ref(), stage, notification),
        }
    }

    fn callback(&self) -> &Callback {
        match self {
            GlobalHook::Always(hook) | GlobalHook::Matched { hook, .. } => hook,
        }
    }
}

/// Invokes registered hooks for each emitted notification.
///
/// Cheap to clone; the hook list is shared.
#[derive(Clone, Debug, Default)]
pub struct HookDispatcher {
    hooks: Arc<[GlobalHook]>,
}

impl HookDispatcher {
    /// Create a dispatcher over hooks in registration order.
    pub fn new(hooks: Vec<GlobalHook>) -> Self {
        Self {
            hooks: hooks.into(),
        }
    }

    /// Invoke every accepting hook, in registration order.
    ///
    /// Hooks run synchronously on the caller's turn. A panicking hook is not
    /// caught.
    pub fn dispatch(&self, stage: Stage, notification: &Action) {
        for (index, hook) in self.hooks.iter().enumerate() {
            if hook.accepts(stage, notification) {
                tracing::trace!(hook = index, %stage, "Global hook matched");
                hook.callback().call(notification);
            }
        }
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
