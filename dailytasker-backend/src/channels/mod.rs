pub mod dispatcher;
pub mod telegram;
pub mod types;

pub use dispatcher::CommandDispatcher;
pub use telegram::TelegramChannel;
pub use types::{DispatchResult, FollowUp, NormalizedMessage};
