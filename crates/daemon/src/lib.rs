//! Presence bridge between a console's status feed and Discord.
//!
//! Data flows one way: [`feed::StatusFeed`] yields status lines,
//! [`reconcile::Bridge`] deduplicates them and asks
//! [`resolver::TitleResolver`] for a display record (backed by
//! [`cache::TitleCache`]), and the resulting activity goes to a
//! [`publisher::PresenceSink`].

pub mod cache;
pub mod config;
pub mod feed;
pub mod publisher;
pub mod reconcile;
pub mod resolver;
pub mod retry;
pub mod setup;

#[cfg(test)]
mod test_support;

pub use cache::TitleCache;
pub use feed::{FeedTiming, StatusFeed, StatusSource};
pub use publisher::{DiscordPublisher, PresenceSink, PublishError};
pub use reconcile::Bridge;
pub use resolver::TitleResolver;
