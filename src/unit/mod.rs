//! Composable async work units
//!
//! A unit executes one main operation, broadcasts its lifecycle over a
//! status channel, fires hooks on each transition, and fans out to its
//! dependency list once the main work is done.

pub mod dependency;
pub mod hooks;
pub mod status;
pub mod unit;

pub use dependency::{Dependency, DependencyFn, SettleResult};
pub use hooks::{Context, Hook, HookReaction};
pub use status::{LifecycleState, StatusChannel, StatusObserver, SubscriptionHandle};
pub use unit::{MainOperation, Unit};
