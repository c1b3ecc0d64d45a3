//! Request interception and change notifications for strata.
//!
//! # Interception
//!
//! Every request the dispatcher routes passes through two stages of an
//! [`InterceptorChain`]: `before` runs ahead of the backend, `after` runs on
//! the backend's outcome. An [`Interceptor`] returns a [`Decision`]:
//!
//! - [`Decision::Continue`] lets the pipeline proceed normally.
//! - [`Decision::Override`] substitutes its own outcome. Before the backend,
//!   this means the backend is never called.
//!
//! This is the seam for policy layers (quota checks, auditing, caching) that
//! the engine does not know about.
//!
//! # Notifications
//!
//! Successful mutations are announced on a [`NotificationBus`]. Delivery is
//! best effort: a full or unobserved bus never changes an operation's result.

mod interceptor;
mod notification;

pub use interceptor::{Decision, Interceptor, InterceptorChain, RequestContext};
pub use notification::{Notification, NotificationBus, NotificationEvent};
