// Core infrastructure modules
pub mod core {
    pub mod errors;
}

// The unit execution primitive
pub mod unit;

// Re-exports for convenience
pub use crate::core::errors::{Result, UnitError};
pub use unit::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn end_to_end_pipeline() {
        let child = Unit::new("child", |arg: Value| async move {
            Ok(json!(format!("{}-child", arg.as_str().unwrap_or(""))))
        });

        let mut parent = Unit::new("parent", |_| async move { Ok(json!("root")) })
            .with_dependency(child)
            .with_dependency(Dependency::function(|arg: Value| async move { Ok(arg) }))
            .with_hook(Hook::from_fn(LifecycleState::Done, |ctx| async move {
                tracing::info!("unit {} is done", ctx.id);
                Ok(())
            }));

        let value = parent.run(Value::Null).await.unwrap();
        assert_eq!(value, Some(json!("root")));
        assert_eq!(parent.status_snapshot(), LifecycleState::MainDone);

        let results = parent.run_dependencies().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].value(), Some(&json!("root-child")));
        assert_eq!(results[1].value(), Some(&json!("root")));
        assert_eq!(parent.status_snapshot(), LifecycleState::Done);
        assert!(parent.status().is_closed());
    }
}
