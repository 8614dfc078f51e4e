use crate::config::Config;
use crate::poll::{Poll, PollStatus};
use crate::registry::Timestamp;

/// Lifecycle predicates of a poll.
pub trait PollProvider
{
    fn is_open(&self) -> bool;

    /// Returns true iff the message log has been sealed.
    fn is_closed(&self) -> bool;

    /// Returns true iff `now` has reached the end time of the poll.
    fn has_ended(&self, now: Timestamp) -> bool;

    fn message_limit_reached(&self) -> bool;

    /// Returns true iff every message batch has been processed.
    fn is_processed(&self) -> bool;

    /// Returns true iff the tally commitment is final.
    fn is_finalized(&self) -> bool;
}

impl<T: Config> PollProvider for Poll<T>
{
    fn is_open(&self) -> bool
    {
        self.status == PollStatus::Open
    }

    fn is_closed(&self) -> bool
    {
        self.status >= PollStatus::Closed
    }

    fn has_ended(&self, now: Timestamp) -> bool
    {
        now >= self.end_timestamp
    }

    fn message_limit_reached(&self) -> bool
    {
        self.messages.len() >= self.config.max_values.max_messages as usize
    }

    fn is_processed(&self) -> bool
    {
        self.status >= PollStatus::ProcessingComplete
    }

    fn is_finalized(&self) -> bool
    {
        self.status == PollStatus::Finalized
    }
}
