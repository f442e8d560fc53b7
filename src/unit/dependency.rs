//! Dependency variants and settle-results
//!
//! A dependency is either a plain async function taking the parent's cached
//! result, or a nested unit wired to receive that result as its own run
//! argument. The two are dispatched explicitly through the enum, never via
//! runtime type inspection.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::unit::Unit;

/// Boxed async function dependency: receives the parent's cached main result
pub type DependencyFn = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// A follow-up work item triggered after the parent's main operation
/// completes. Owned exclusively by the parent unit.
pub enum Dependency {
    /// Plain async function invoked with the parent's cached result
    Function(DependencyFn),
    /// Nested unit; the parent's cached result becomes its run argument, and
    /// its whole subtree finishes before the branch settles
    Unit(Box<Unit>),
}

impl Dependency {
    /// Wrap an async closure as a function dependency
    pub fn function<F, Fut>(func: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Dependency::Function(Arc::new(move |arg| Box::pin(func(arg))))
    }

    /// Wrap a nested unit as a dependency
    pub fn unit(unit: Unit) -> Self {
        Dependency::Unit(Box::new(unit))
    }

    /// Run this branch to settlement with the parent's cached result.
    ///
    /// Boxed because nested units recurse back into their own fan-out.
    pub(crate) fn settle(&mut self, arg: Value) -> BoxFuture<'_, SettleResult> {
        Box::pin(async move {
            match self {
                Dependency::Function(func) => match func(arg).await {
                    Ok(value) => SettleResult::fulfilled(value),
                    Err(e) => SettleResult::rejected(e.to_string()),
                },
                Dependency::Unit(unit) => {
                    let run_res = unit.run(arg).await;
                    // The subtree runs unconditionally, even when the nested
                    // main operation failed; an errored child rejects the
                    // branch through its illegal-state precondition.
                    let deps_res = unit.run_dependencies().await;
                    match (run_res, deps_res) {
                        (Ok(Some(value)), Ok(_)) => SettleResult::fulfilled(value),
                        (_, Err(e)) => SettleResult::rejected(e.to_string()),
                        (Err(e), Ok(_)) => SettleResult::rejected(e.to_string()),
                        (Ok(None), Ok(_)) => SettleResult::rejected(format!(
                            "nested unit '{}' failed its main operation",
                            unit.id()
                        )),
                    }
                }
            }
        })
    }
}

impl From<Unit> for Dependency {
    fn from(unit: Unit) -> Self {
        Dependency::unit(unit)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Function(_) => f.write_str("Dependency::Function"),
            Dependency::Unit(unit) => f.debug_tuple("Dependency::Unit").field(unit).finish(),
        }
    }
}

/// Per-branch outcome of dependency fan-out, collected with settle-all
/// semantics: one branch's failure never aborts or masks another's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettleResult {
    Fulfilled { value: Value },
    Rejected { reason: String },
}

impl SettleResult {
    pub fn fulfilled(value: Value) -> Self {
        SettleResult::Fulfilled { value }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        SettleResult::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, SettleResult::Fulfilled { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, SettleResult::Rejected { .. })
    }

    /// The fulfilled value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            SettleResult::Fulfilled { value } => Some(value),
            SettleResult::Rejected { .. } => None,
        }
    }

    /// The rejection reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            SettleResult::Fulfilled { .. } => None,
            SettleResult::Rejected { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn settle_result_serializes_tagged() {
        let fulfilled = SettleResult::fulfilled(json!(42));
        let rejected = SettleResult::rejected("boom");

        assert_eq!(
            serde_json::to_value(&fulfilled).unwrap(),
            json!({"status": "fulfilled", "value": 42})
        );
        assert_eq!(
            serde_json::to_value(&rejected).unwrap(),
            json!({"status": "rejected", "reason": "boom"})
        );
    }

    #[tokio::test]
    async fn function_branch_settles_both_ways() {
        let mut ok = Dependency::function(|arg| async move { Ok(arg) });
        let mut bad = Dependency::function(|_| async move { anyhow::bail!("no luck") });

        assert_eq!(
            ok.settle(json!("payload")).await,
            SettleResult::fulfilled(json!("payload"))
        );
        assert_eq!(
            bad.settle(json!("payload")).await,
            SettleResult::rejected("no luck")
        );
    }
}
