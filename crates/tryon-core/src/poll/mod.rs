//! Status polling with capped exponential backoff.

pub(crate) mod backoff;
pub(crate) mod poller;

pub use backoff::{next_interval, Backoff};
pub use poller::{PollOutcome, StatusPoller};
