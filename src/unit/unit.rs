//! The unit execution primitive
//!
//! A [`Unit`] wraps one async main operation plus the follow-up work keyed to
//! it: hooks fired on lifecycle transitions, and a dependency list fanned out
//! once the main operation has finished. Callers assemble trees of units
//! explicitly; there is no global registry or coordinator.

use std::fmt;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::core::errors::{Result, UnitError};

use super::dependency::{Dependency, SettleResult};
use super::hooks::{Context, Hook};
use super::status::{LifecycleState, StatusChannel};

/// Boxed async main operation. Its result must never be empty: a resolution
/// of `Value::Null` is rejected at runtime (the type system cannot see inside
/// the closure at construction) so dependency fan-out always has a meaningful
/// payload to forward.
pub type MainOperation = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// A unit of asynchronous work.
///
/// Lifecycle: `Initialized → Running → {MainDone | Error}`, then
/// `MainDone → RunningDependencies → Done`. `Done` and `Error` are terminal.
/// Status only moves forward along this graph and is mutated exclusively by
/// the unit's own transition logic; misuse fails with
/// [`UnitError::IllegalState`] instead of mutating anything.
///
/// The host drives the two phases itself: `run()` to completion, then
/// `run_dependencies()`. The unit does not auto-chain them.
pub struct Unit {
    id: String,
    main: MainOperation,
    main_result: Option<Value>,
    dependencies: Vec<Dependency>,
    hooks: Vec<Hook>,
    status_snapshot: LifecycleState,
    status: StatusChannel,
}

impl Unit {
    /// Create a unit in the `Initialized` state from an async closure.
    ///
    /// The id is an opaque label used in logs and hook contexts; it is not
    /// required to be unique.
    pub fn new<F, Fut>(id: impl Into<String>, main: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::from_operation(id, Arc::new(move |arg| Box::pin(main(arg))))
    }

    /// Create a unit from an already-boxed main operation
    pub fn from_operation(id: impl Into<String>, main: MainOperation) -> Self {
        Self {
            id: id.into(),
            main,
            main_result: None,
            dependencies: Vec::new(),
            hooks: Vec::new(),
            status_snapshot: LifecycleState::Initialized,
            status: StatusChannel::new(),
        }
    }

    /// Append one dependency
    pub fn with_dependency(mut self, dependency: impl Into<Dependency>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Append a list of dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Append one hook
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Append a list of hooks
    pub fn with_hooks(mut self, hooks: Vec<Hook>) -> Self {
        self.hooks.extend(hooks);
        self
    }

    /// Read-only identity
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state, point-in-time
    pub fn status_snapshot(&self) -> LifecycleState {
        self.status_snapshot
    }

    /// The broadcast channel of lifecycle transitions owned by this unit
    pub fn status(&self) -> &StatusChannel {
        &self.status
    }

    /// The cached main result; present exactly from `MainDone` onward on the
    /// success path
    pub fn main_result(&self) -> Option<&Value> {
        self.main_result.as_ref()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Execute the main operation.
    ///
    /// Transitions to `Running`, awaits the operation, then transitions to
    /// `MainDone` (caching and returning the resolved value) or to `Error`
    /// (returning `None`). A main-operation failure is absorbed into the
    /// `Error` state, never re-raised; the only error this method returns is
    /// [`UnitError::IllegalState`] when the unit is not freshly initialized.
    pub async fn run(&mut self, args: Value) -> Result<Option<Value>> {
        if self.status_snapshot != LifecycleState::Initialized {
            return Err(UnitError::IllegalState {
                unit: self.id.clone(),
                expected: LifecycleState::Initialized,
                found: self.status_snapshot,
            });
        }
        self.transition(LifecycleState::Running).await;
        match (self.main)(args).await {
            Ok(value) if !value.is_null() => {
                self.main_result = Some(value.clone());
                self.transition(LifecycleState::MainDone).await;
                Ok(Some(value))
            }
            Ok(_) => {
                let err = UnitError::EmptyResult {
                    unit: self.id.clone(),
                };
                error!("{err}");
                self.transition(LifecycleState::Error).await;
                Ok(None)
            }
            Err(e) => {
                let err = UnitError::MainExecution {
                    unit: self.id.clone(),
                    message: e.to_string(),
                };
                error!("{err}");
                self.transition(LifecycleState::Error).await;
                Ok(None)
            }
        }
    }

    /// Fan out to all dependencies concurrently and aggregate their
    /// settle-results.
    ///
    /// Requires the unit to be in `MainDone`; otherwise fails with
    /// [`UnitError::IllegalState`] before any transition or side effect.
    /// Every branch starts before any is awaited; a branch's failure is
    /// recorded independently and never aborts or masks its siblings. The
    /// returned results preserve dependency-list order regardless of
    /// completion order. On resolution the unit is `Done` and its status
    /// channel has signaled completion.
    pub async fn run_dependencies(&mut self) -> Result<Vec<SettleResult>> {
        let arg = match (self.status_snapshot, &self.main_result) {
            (LifecycleState::MainDone, Some(value)) => value.clone(),
            _ => {
                return Err(UnitError::IllegalState {
                    unit: self.id.clone(),
                    expected: LifecycleState::MainDone,
                    found: self.status_snapshot,
                })
            }
        };
        self.transition(LifecycleState::RunningDependencies).await;

        let branches: Vec<_> = self
            .dependencies
            .iter_mut()
            .map(|dependency| dependency.settle(arg.clone()))
            .collect();
        let results = join_all(branches).await;

        for (index, result) in results.iter().enumerate() {
            if let SettleResult::Rejected { reason } = result {
                let err = UnitError::DependencyBranch {
                    unit: self.id.clone(),
                    index,
                    message: reason.clone(),
                };
                warn!("{err}");
            }
        }

        self.transition(LifecycleState::Done).await;
        self.status.complete();
        Ok(results)
    }

    /// Move to `state`, broadcast it, then fire all hooks registered for it
    /// concurrently with the same context snapshot. Does not return until
    /// every reaction has settled; reaction failures are logged and swallowed.
    async fn transition(&mut self, state: LifecycleState) {
        debug!(unit = %self.id, ?state, "lifecycle transition");
        self.status_snapshot = state;
        self.status.emit(state);

        let ctx = Context {
            id: self.id.clone(),
            state,
            main_result: self.main_result.clone(),
        };
        let firing: Vec<_> = self
            .hooks
            .iter()
            .filter(|hook| hook.on_state() == state)
            .map(|hook| hook.fire(ctx.clone()))
            .collect();
        if firing.is_empty() {
            return;
        }
        for outcome in join_all(firing).await {
            if let Err(e) = outcome {
                let err = UnitError::HookReaction {
                    unit: self.id.clone(),
                    state,
                    message: e.to_string(),
                };
                warn!("{err}");
            }
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("status", &self.status_snapshot)
            .field("dependencies", &self.dependencies.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
