//! Callback system for training events
//!
//! Hooks for `on_train_begin` / `on_train_end`, `on_step_end`,
//! `on_evaluation` and `on_checkpoint`.
//!
//! # Example
//!
//! ```rust
//! use sentence_tune::train::callback::{CallbackAction, CallbackContext, TrainerCallback};
//!
//! struct StopAt(usize);
//!
//! impl TrainerCallback for StopAt {
//!     fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
//!         if ctx.global_step >= self.0 {
//!             CallbackAction::Stop
//!         } else {
//!             CallbackAction::Continue
//!         }
//!     }
//! }
//! ```

mod logging;
mod manager;
mod traits;

pub use logging::LoggingCallback;
pub use manager::CallbackManager;
pub use traits::{CallbackAction, CallbackContext, TrainerCallback};
