//! Core request handling for mailpoll
//!
//! Ties the token service and IMAP authentication together into the two
//! operations exposed over HTTP: polling a mailbox and fetching a Gmail token.

mod error;
mod poll;

pub use error::{CoreError, CoreResult};
pub use poll::{PollRequest, PollResponse, PollService, TokenRequest, INBOX};
