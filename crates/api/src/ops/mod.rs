//! One-shot operational commands: bootstrap initialization, index pool
//! priming and the `start` sequence.

pub mod init;
pub mod prime;

use std::future::Future;
use std::pin::Pin;

use anyhow::Context;

pub type StepFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A named unit of work in a sequence.
pub struct Step {
    pub name: &'static str,
    run: Box<dyn FnOnce() -> StepFuture + Send>,
}

impl Step {
    pub fn new<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name,
            run: Box::new(move || Box::pin(run())),
        }
    }
}

/// Run `steps` in order, once each, stopping at the first failure.
pub async fn run_steps(steps: Vec<Step>) -> anyhow::Result<()> {
    let total = steps.len();
    for (i, step) in steps.into_iter().enumerate() {
        tracing::info!(step = step.name, position = i + 1, total, "Running step");
        (step.run)()
            .await
            .with_context(|| format!("step '{}' failed", step.name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str, ok: bool) -> Step {
        let log = Arc::clone(log);
        Step::new(name, move || async move {
            log.lock().unwrap().push(name);
            if ok {
                Ok(())
            } else {
                anyhow::bail!("{name} exploded")
            }
        })
    }

    #[tokio::test]
    async fn all_steps_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording(&log, "migrate", true),
            recording(&log, "init", true),
            recording(&log, "serve", true),
        ];

        run_steps(steps).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["migrate", "init", "serve"]);
    }

    #[tokio::test]
    async fn first_failure_stops_the_sequence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording(&log, "migrate", true),
            recording(&log, "init", false),
            recording(&log, "serve", true),
        ];

        let err = run_steps(steps).await.unwrap_err();
        assert!(err.to_string().contains("init"));
        assert_eq!(*log.lock().unwrap(), vec!["migrate", "init"]);
    }
}
