//! Standard middlewares for job chains.

mod error;
mod logging;
mod overlap;
mod slack;

pub use error::SlackError;
pub use logging::Logging;
pub use overlap::Overlap;
pub use slack::{Slack, SlackAttachment, SlackConfig, SlackMessage};
