//! Operator prompt port (interface).

use std::future::Future;

use crate::error::Result;

/// Port for interactive choices.
pub trait Prompter: Send + Sync {
    /// Present a 1-indexed list of `options` under `title` and wait for a choice.
    ///
    /// Returns `Ok(Some(index))` with a zero-based index, or `Ok(None)` when
    /// the operator quits. Invalid input must be re-prompted, not returned.
    fn choose(
        &self,
        title: &str,
        options: &[String],
    ) -> impl Future<Output = Result<Option<usize>>> + Send;
}
