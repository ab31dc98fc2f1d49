//! Terminal prompts for the email and password the resolver may ask for.

use async_trait::async_trait;
use std::io::{BufRead, BufReader, Write};
use tokio::sync::{mpsc, oneshot};

use linkforge_core::{EmailPrompter, PasswordPrompter, ProviderId, Secret};

type LineRequest = oneshot::Sender<Option<String>>;

/// Reads answers line by line from stdin.
///
/// Lines are read on a dedicated thread, one per request, so a dropped
/// prompt never holds up runtime shutdown. An empty line or end of input
/// declines the prompt.
pub struct TerminalPrompter {
    requests: mpsc::UnboundedSender<LineRequest>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(std::io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(mut reader: R) -> Self {
        let (requests, mut pending) = mpsc::unbounded_channel::<LineRequest>();
        std::thread::spawn(move || {
            while let Some(reply) = pending.blocking_recv() {
                let mut line = String::new();
                let answer = match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => Some(line),
                };
                let _ = reply.send(answer);
            }
        });
        Self { requests }
    }

    async fn ask(&self, question: &str) -> Option<String> {
        eprint!("{} ", question);
        let _ = std::io::stderr().flush();

        let (reply, answer) = oneshot::channel();
        self.requests.send(reply).ok()?;
        let line = answer.await.ok()??;
        let answer = line.trim_end_matches(['\r', '\n']).to_string();
        (!answer.trim().is_empty()).then_some(answer)
    }
}

#[async_trait]
impl EmailPrompter for TerminalPrompter {
    async fn prompt_for_email(&self, attempted: &ProviderId) -> Option<String> {
        eprintln!(
            "An account already exists for your {} sign-in, but the provider did not share its email.",
            attempted
        );
        self.ask("Email of your existing account (empty to cancel):").await
    }
}

#[async_trait]
impl PasswordPrompter for TerminalPrompter {
    async fn prompt_for_password(&self, email: &str) -> Option<Secret> {
        eprintln!("{} signs in with a password. Enter it to link the accounts.", email);
        self.ask("Password (empty to cancel):").await.map(Secret::new)
    }
}
