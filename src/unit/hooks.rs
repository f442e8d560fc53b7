//! Hook registry types
//!
//! Hooks are side-effect reactions keyed to one lifecycle state. They process
//! a point-in-time snapshot of the unit and never mutate unit state.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use super::status::LifecycleState;

/// Snapshot of a unit passed to a firing hook, captured at the moment the
/// unit entered the hook's trigger state.
#[derive(Debug, Clone, Serialize)]
pub struct Context {
    /// Identity of the owning unit
    pub id: String,
    /// The state that triggered the hook
    pub state: LifecycleState,
    /// The cached main result; absent before `MainDone`
    pub main_result: Option<Value>,
}

/// Async reaction invoked when the owning unit enters the hook's trigger
/// state. A reaction's failure is logged and swallowed: it never reaches the
/// caller, never changes the unit's status and never cancels sibling hooks.
#[async_trait]
pub trait HookReaction: Send + Sync {
    async fn run(&self, ctx: Context) -> anyhow::Result<()>;
}

type ReactionFn = Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Adapter so plain async closures can be used as reactions without a
/// dedicated trait impl
struct FnReaction {
    func: ReactionFn,
}

#[async_trait]
impl HookReaction for FnReaction {
    async fn run(&self, ctx: Context) -> anyhow::Result<()> {
        (self.func)(ctx).await
    }
}

/// A (trigger state, reaction) pair. The list of hooks on a unit is fixed at
/// construction.
#[derive(Clone)]
pub struct Hook {
    on_state: LifecycleState,
    reaction: Arc<dyn HookReaction>,
}

impl Hook {
    /// Create a hook from a reaction trait object
    pub fn new(on_state: LifecycleState, reaction: Arc<dyn HookReaction>) -> Self {
        Self { on_state, reaction }
    }

    /// Create a hook from an async closure
    ///
    /// ```
    /// use unitflow::{Hook, LifecycleState};
    ///
    /// let hook = Hook::from_fn(LifecycleState::MainDone, |ctx| async move {
    ///     println!("{} finished its main work", ctx.id);
    ///     Ok(())
    /// });
    /// assert_eq!(hook.on_state(), LifecycleState::MainDone);
    /// ```
    pub fn from_fn<F, Fut>(on_state: LifecycleState, func: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let func: ReactionFn = Arc::new(move |ctx| Box::pin(func(ctx)));
        Self {
            on_state,
            reaction: Arc::new(FnReaction { func }),
        }
    }

    /// The state this hook is registered against
    pub fn on_state(&self) -> LifecycleState {
        self.on_state
    }

    pub(crate) fn fire(&self, ctx: Context) -> BoxFuture<'static, anyhow::Result<()>> {
        let reaction = Arc::clone(&self.reaction);
        Box::pin(async move { reaction.run(ctx).await })
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("on_state", &self.on_state)
            .finish()
    }
}
