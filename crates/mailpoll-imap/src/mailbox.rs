//! Mailbox queries on an authenticated session

use std::fmt;

use futures::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::{ImapError, ImapResult, MailSession};

/// Unread messages in a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnseenMessages {
    /// Folder that was selected
    pub folder: String,
    /// Total messages in the folder
    pub exists: u32,
    /// UIDs without the \Seen flag, ascending
    pub uids: Vec<u32>,
}

/// Select `folder` and list the UIDs of its unseen messages
pub async fn unseen_uids<S>(session: &mut MailSession<S>, folder: &str) -> ImapResult<UnseenMessages>
where
    S: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send,
{
    let mailbox = session
        .select(folder)
        .await
        .map_err(|e| ImapError::ServerError(format!("SELECT {}: {}", folder, e)))?;

    let mut uids: Vec<u32> = session
        .uid_search("UNSEEN")
        .await
        .map_err(|e| ImapError::ServerError(format!("UID SEARCH UNSEEN: {}", e)))?
        .into_iter()
        .collect();
    uids.sort_unstable();

    debug!(
        "Selected folder {} with {} messages, {} unseen",
        folder,
        mailbox.exists,
        uids.len()
    );

    Ok(UnseenMessages {
        folder: folder.to_string(),
        exists: mailbox.exists,
        uids,
    })
}
