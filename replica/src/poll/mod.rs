pub mod config;
pub mod coordinator;
pub mod poll;
pub mod provider;
pub mod state;
pub mod tally;

pub use config::{BatchSizes, MaxValues, PollConfiguration, TreeDepths, VoteMode};
pub use coordinator::{Coordinator, SaltDomain};
pub use poll::{Poll, PollId, ProcessedBatch, SlotOutcome};
pub use provider::PollProvider;
pub use state::{Ballot, PollStatus, TallyState};
pub use tally::TalliedBatch;
