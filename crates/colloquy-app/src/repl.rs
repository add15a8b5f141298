use colloquy::{
    find_model, ChatState, ConversationEngine, EngineError, GenerationOutcome, LocalSession,
    Message, Role, AVAILABLE_MODELS, DEFAULT_USER_ID,
};
use std::collections::HashSet;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{Command, HELP};

pub enum CommandResult {
    Continue,
    Exit,
}

/// Line-oriented chat loop over a [`ConversationEngine`]
pub struct Repl<W> {
    engine: ConversationEngine,
    session: Arc<LocalSession>,
    out: W,
}

impl<W: Write> Repl<W> {
    pub fn new(engine: ConversationEngine, session: Arc<LocalSession>, out: W) -> Self {
        Self {
            engine,
            session,
            out,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Read commands until `/quit`, end of input or Ctrl+C at the prompt
    pub async fn run<R>(&mut self, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                writeln!(self.out)?;
                break;
            };

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(self.out, "{}", e)?;
                    continue;
                }
            };

            if let CommandResult::Exit = self.execute(command).await? {
                break;
            }
        }

        writeln!(self.out, "Goodbye!")?;
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> anyhow::Result<CommandResult> {
        match command {
            Command::Send(text) => {
                let thread_id = self.ensure_active_thread();
                let engine = self.engine.clone();
                self.stream_reply(&thread_id, engine.send_message(&thread_id, &text))
                    .await?;
            }
            Command::New => {
                let thread = self.engine.create_thread(&self.engine.current_user_id());
                writeln!(self.out, "Started a new chat.")?;
                tracing::debug!(thread_id = %thread.id, "New chat from prompt");
            }
            Command::Threads => self.list_threads()?,
            Command::Switch(position) => match position
                .checked_sub(1)
                .and_then(|i| self.engine.threads().get(i).cloned())
            {
                Some(thread) => {
                    self.engine.set_active_thread(&thread.id);
                    writeln!(self.out, "Switched to \"{}\".", thread.title)?;
                    for message in &thread.messages {
                        self.print_message(message)?;
                    }
                }
                None => writeln!(self.out, "No chat #{}.", position)?,
            },
            Command::Rename(title) => {
                let Some(thread_id) = self.active_thread_id()? else {
                    return Ok(CommandResult::Continue);
                };
                let saved = self.engine.rename_thread(&thread_id, &title).await;
                self.report_write(saved)?;
                writeln!(self.out, "Renamed to \"{}\".", title)?;
            }
            Command::Edit { index, text } => {
                let Some(thread_id) = self.active_thread_id()? else {
                    return Ok(CommandResult::Continue);
                };
                let target = self
                    .engine
                    .thread(&thread_id)
                    .and_then(|t| {
                        let i = index.checked_sub(1)?;
                        t.messages.get(i).map(|m| m.id.clone())
                    });
                let Some(message_id) = target else {
                    writeln!(self.out, "No message #{} in this chat.", index)?;
                    return Ok(CommandResult::Continue);
                };

                let engine = self.engine.clone();
                self.stream_reply(
                    &thread_id,
                    engine.edit_message(&thread_id, &message_id, &text),
                )
                .await?;
            }
            Command::Delete => {
                let Some(thread_id) = self.active_thread_id()? else {
                    return Ok(CommandResult::Continue);
                };
                let saved = self.engine.delete_thread(&thread_id).await;
                self.report_write(saved)?;
                writeln!(self.out, "Chat deleted.")?;
            }
            Command::Export(dir) => {
                let Some(thread_id) = self.active_thread_id()? else {
                    return Ok(CommandResult::Continue);
                };
                let dir = dir.unwrap_or_else(|| PathBuf::from("."));
                let path = self.export(&thread_id, &dir).await?;
                writeln!(self.out, "Exported to {}.", path.display())?;
            }
            Command::Model(None) => {
                let selected = self.engine.selected_model();
                for model in AVAILABLE_MODELS {
                    let marker = if model.id == selected { "*" } else { " " };
                    writeln!(self.out, "{} {} - {}", marker, model.id, model.description)?;
                }
            }
            Command::Model(Some(id)) => {
                self.engine.set_selected_model(id.clone());
                match find_model(&id) {
                    Some(model) => writeln!(self.out, "Switched to {}.", model.name)?,
                    None => writeln!(self.out, "Switched to {} (not a known model).", id)?,
                }
            }
            Command::Login(user_id) => {
                self.session.login(user_id.clone());
                self.reload(&user_id).await?;
            }
            Command::Logout => {
                self.session.logout();
                self.reload(DEFAULT_USER_ID).await?;
            }
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => return Ok(CommandResult::Exit),
        }

        Ok(CommandResult::Continue)
    }

    fn ensure_active_thread(&self) -> String {
        match self.engine.active_thread() {
            Some(thread) => thread.id,
            None => self.engine.create_thread(&self.engine.current_user_id()).id,
        }
    }

    fn active_thread_id(&mut self) -> anyhow::Result<Option<String>> {
        let id = self.engine.active_thread().map(|t| t.id);
        if id.is_none() {
            writeln!(self.out, "No active chat. Use /new or /switch <n>.")?;
        }
        Ok(id)
    }

    fn list_threads(&mut self) -> anyhow::Result<()> {
        let state = self.engine.snapshot();
        if state.threads.is_empty() {
            writeln!(self.out, "No chats yet.")?;
        }
        for (i, thread) in state.threads.iter().enumerate() {
            let marker = if state.active_thread_id.as_deref() == Some(thread.id.as_str()) {
                "*"
            } else {
                " "
            };
            writeln!(
                self.out,
                "{} {:>2}. {} ({} messages)",
                marker,
                i + 1,
                thread.title,
                thread.messages.len()
            )?;
        }
        Ok(())
    }

    fn print_message(&mut self, message: &Message) -> anyhow::Result<()> {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        writeln!(self.out, "[{}] {}", speaker, message.content)?;
        Ok(())
    }

    fn report_write(&mut self, result: Result<(), colloquy::PersistError>) -> anyhow::Result<()> {
        if let Err(e) = result {
            writeln!(self.out, "(not saved: {})", e)?;
        }
        Ok(())
    }

    async fn export(&self, thread_id: &str, dir: &Path) -> anyhow::Result<PathBuf> {
        let export = self.engine.export_thread(thread_id)?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&export.file_name);
        tokio::fs::write(&path, export.markdown).await?;
        Ok(path)
    }

    async fn reload(&mut self, user_id: &str) -> anyhow::Result<()> {
        self.engine.reset();
        match self.engine.load_all(user_id).await {
            Ok(threads) => writeln!(
                self.out,
                "Signed in as {} ({} chats).",
                user_id,
                threads.len()
            )?,
            Err(e) => writeln!(self.out, "Could not load chats: {}", e)?,
        }
        Ok(())
    }

    /// Drive a generation, echoing the reply as it grows. Ctrl+C stops it.
    async fn stream_reply<F>(&mut self, thread_id: &str, generation: F) -> anyhow::Result<()>
    where
        F: Future<Output = Result<Option<GenerationOutcome>, EngineError>>,
    {
        let baseline: HashSet<String> = self
            .engine
            .thread(thread_id)
            .map(|t| t.messages.into_iter().map(|m| m.id).collect())
            .unwrap_or_default();
        let mut rx = self.engine.subscribe();
        let mut echo = ReplyEcho::default();
        tokio::pin!(generation);

        let result = loop {
            tokio::select! {
                result = &mut generation => break result,
                Ok(()) = rx.changed() => {
                    let chunk = {
                        let state = rx.borrow_and_update();
                        find_reply(&state, thread_id, &baseline).map(|m| echo.unseen(m).to_string())
                    };
                    if let Some(chunk) = chunk {
                        write!(self.out, "{}", chunk)?;
                        self.out.flush()?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    self.engine.cancel_generation(thread_id);
                }
            }
        };

        // The final snapshot may land together with completion
        let tail = find_reply(&self.engine.snapshot(), thread_id, &baseline)
            .map(|m| echo.unseen(m).to_string());
        if let Some(tail) = tail {
            write!(self.out, "{}", tail)?;
        }
        if echo.started() {
            writeln!(self.out)?;
        }

        match result {
            Ok(Some(GenerationOutcome::Cancelled(_))) => writeln!(self.out, "[stopped]")?,
            Ok(_) => {}
            Err(e) => writeln!(self.out, "Error: {}", e)?,
        }
        self.out.flush()?;
        Ok(())
    }
}

/// The assistant message created after `baseline` was taken
fn find_reply<'a>(
    state: &'a ChatState,
    thread_id: &str,
    baseline: &HashSet<String>,
) -> Option<&'a Message> {
    state
        .thread(thread_id)?
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && !baseline.contains(&m.id))
}

/// Tracks how much of a cumulative reply has been written out
#[derive(Debug, Default)]
struct ReplyEcho {
    message_id: Option<String>,
    written: usize,
}

impl ReplyEcho {
    /// The part of `message` not yet written
    fn unseen<'a>(&mut self, message: &'a Message) -> &'a str {
        if self.message_id.as_deref() != Some(message.id.as_str()) {
            self.message_id = Some(message.id.clone());
            self.written = 0;
        }
        let rest = message.content.get(self.written..).unwrap_or("");
        self.written = message.content.len();
        rest
    }

    fn started(&self) -> bool {
        self.message_id.is_some()
    }
}
