//! Callback manager for dispatching events to multiple callbacks

use std::path::Path;

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Manages multiple callbacks and dispatches events
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    /// Create new callback manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback
    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// Check if no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Get number of callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Fire train begin event
    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_train_begin(ctx))
    }

    /// Fire train end event
    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx);
        }
    }

    /// Fire step end event
    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_step_end(ctx))
    }

    /// Fire evaluation event
    pub fn on_evaluation(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_evaluation(ctx))
    }

    /// Fire checkpoint event
    pub fn on_checkpoint(&mut self, ctx: &CallbackContext, path: &Path) {
        for cb in &mut self.callbacks {
            cb.on_checkpoint(ctx, path);
        }
    }

    /// Every callback sees the event; any `Stop` wins
    fn dispatch<F>(&mut self, mut event: F) -> CallbackAction
    where
        F: FnMut(&mut dyn TrainerCallback) -> CallbackAction,
    {
        let mut action = CallbackAction::Continue;
        for cb in &mut self.callbacks {
            if event(cb.as_mut()) == CallbackAction::Stop {
                action = CallbackAction::Stop;
            }
        }
        action
    }
}

impl std::fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.callbacks.iter().map(|cb| cb.name()).collect();
        f.debug_struct("CallbackManager").field("callbacks", &names).finish()
    }
}
