//! Client side of the wall: polls the feed, decides which rows are new,
//! plays each new row's typing reveal once, and keeps the counter and
//! submission form in step through an in-process event bus.

pub mod animated;
pub mod bus;
pub mod counter;
pub mod error;
pub mod feed;
pub mod form;
pub mod poller;
pub mod source;
pub mod storage;
pub mod typing;

pub use error::FeedError;
