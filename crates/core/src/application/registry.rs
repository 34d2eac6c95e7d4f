// Handler Registry - job name -> handler

use crate::domain::job_name_problem;
use crate::error::{AppError, Result};
use crate::port::JobHandler;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// One handler per job name.
///
/// Registration is a startup concern; lookups happen on every dispatch.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `handler`.
    ///
    /// # Errors
    /// - `AppError::Validation` if `name` is empty or padded with whitespace,
    ///   the same rule `JobSpec::validate` applies to job names
    /// - `AppError::Conflict` if `name` already has a handler; the existing
    ///   registration is left in place
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> Result<()>
    where
        H: JobHandler + 'static,
    {
        self.register_arc(name, Arc::new(handler))
    }

    pub fn register_arc(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<()> {
        let name = name.into();
        if let Some(problem) = job_name_problem(&name) {
            return Err(AppError::Validation(format!("handler name {}", problem)));
        }

        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&name) {
            return Err(AppError::Conflict(format!(
                "handler already registered for job name '{}'",
                name
            )));
        }
        info!(job_name = %name, "Registered job handler");
        handlers.insert(name, handler);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
