//! In-process IMAP server double for tests
//!
//! Enabled for this crate's unit tests and, through the `test-util`
//! feature, for dependent crates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_std::io::prelude::*;
use async_std::io::BufReader;
use async_std::net::{TcpListener, TcpStream};
use async_trait::async_trait;

use crate::{Connector, ImapError, ImapResult, ServerTarget};

/// Plain TCP connector that counts its connection attempts
#[derive(Debug, Clone, Default)]
pub struct PlainConnector {
    attempts: Arc<AtomicUsize>,
}

impl PlainConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for PlainConnector {
    type Stream = TcpStream;

    async fn connect(&self, target: &ServerTarget) -> ImapResult<TcpStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|e| ImapError::ConnectionFailed(e.to_string()))
    }
}

/// How the fake server answers authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    AcceptXOAuth2,
    /// Gmail-style rejection: error-details challenge, then a tagged NO
    RejectXOAuth2,
    /// Close the connection once the client response arrives
    HangUpAfterResponse,
    AcceptLogin,
    RejectLogin,
    /// Accept LOGIN, then refuse to SELECT any folder
    AcceptLoginWithoutInbox,
}

/// A single-connection scripted IMAP server on 127.0.0.1
pub struct FakeImapServer {
    port: u16,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeImapServer {
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let commands = Arc::new(Mutex::new(Vec::new()));

        let log = commands.clone();
        async_std::task::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                serve(stream, script, log).await;
            }
        });

        Self { port, commands }
    }

    pub fn target(&self) -> ServerTarget {
        ServerTarget::new("127.0.0.1", self.port)
    }

    /// Lines received from the client, without line endings
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

async fn serve(stream: TcpStream, script: Script, log: Arc<Mutex<Vec<String>>>) {
    let mut writer = stream.clone();
    let mut reader = BufReader::new(stream);

    if writer.write_all(b"* OK fake IMAP4rev1 ready\r\n").await.is_err() {
        return;
    }

    let mut tag = String::new();
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        log.lock().unwrap().push(line.clone());

        let mut words = line.split_whitespace();
        let first = words.next().unwrap_or_default().to_string();
        let command = words.next().unwrap_or_default().to_ascii_uppercase();

        let reply = match (script, command.as_str()) {
            (_, "AUTHENTICATE") => {
                tag = first;
                "+ \r\n".to_string()
            }
            (Script::AcceptLogin | Script::AcceptLoginWithoutInbox, "LOGIN") => {
                format!("{} OK LOGIN completed\r\n", first)
            }
            (_, "LOGIN") => format!(
                "{} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n",
                first
            ),
            (Script::AcceptLoginWithoutInbox, "SELECT") => {
                format!("{} NO Mailbox doesn't exist\r\n", first)
            }
            (_, "SELECT") => format!(
                "* 3 EXISTS\r\n* 0 RECENT\r\n* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n{} OK [READ-WRITE] SELECT completed\r\n",
                first
            ),
            (_, "UID") => format!("* SEARCH 4 7\r\n{} OK SEARCH completed\r\n", first),
            (_, "LOGOUT") => format!("{} OK LOGOUT completed\r\n", first),
            (Script::AcceptXOAuth2, _) => format!("{} OK user authenticated (Success)\r\n", tag),
            (Script::RejectXOAuth2, _) if !line.is_empty() => {
                // base64 of {"status":"400","schemes":"Bearer","scope":"https://mail.google.com/"}
                "+ eyJzdGF0dXMiOiI0MDAiLCJzY2hlbWVzIjoiQmVhcmVyIiwic2NvcGUiOiJodHRwczovL21haWwuZ29vZ2xlLmNvbS8ifQ==\r\n".to_string()
            }
            (Script::RejectXOAuth2, _) => format!(
                "{} NO [AUTHENTICATIONFAILED] Invalid credentials (Failure)\r\n",
                tag
            ),
            (Script::HangUpAfterResponse, _) => return,
            _ => format!("{} BAD unexpected command\r\n", first),
        };

        if writer.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}
