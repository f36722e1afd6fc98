use std::time::Duration;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SIZE: usize = 100;

/// Batching configuration consumed when a loader is constructed.
///
/// `delay` is how long (in milliseconds) a batch stays open collecting keys
/// before it is dispatched. `max_size` closes a batch early once that many
/// distinct keys have been collected; `None` (or `0`) leaves the batch size
/// unbounded so only the delay timer closes it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Setters)]
#[serde(rename_all = "camelCase", default)]
#[setters(strip_option)]
pub struct Batch {
    pub delay: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,
}

impl Default for Batch {
    fn default() -> Self {
        Batch { delay: 0, max_size: Some(DEFAULT_MAX_SIZE) }
    }
}

impl Batch {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.delay as u64)
    }

    /// Batching is considered disabled when neither trigger is configured.
    pub fn is_enabled(&self) -> bool {
        self.delay >= 1 || self.max_size.is_some_and(|size| size >= 1)
    }
}
