mod account;
mod event;

pub use account::{Account, CreateAccount, SubscriptionPatch, SubscriptionState, SubscriptionStatus};
pub use event::{EventRecord, RecordEvent};
