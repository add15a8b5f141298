use std::path::PathBuf;

pub const HELP: &str = "\
Available commands:
  <text>                 - Send a message to the active chat
  /new                   - Start a new chat
  /threads               - List chats (* marks the active one)
  /switch <n>            - Make chat n active
  /rename <title>        - Rename the active chat
  /edit <n> <text>       - Replace message n and regenerate the reply
  /delete                - Delete the active chat
  /export [dir]          - Write the active chat to a Markdown file
  /model [id]            - Show or change the model
  /login <user>          - Sign in and load that user's chats
  /logout                - Sign out
  /help                  - Show this help message
  /quit, /exit           - Exit
  Ctrl+C                 - Stop a streaming reply";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    Threads,
    /// 1-based position in the thread list
    Switch(usize),
    Rename(String),
    /// 1-based position in the active thread
    Edit { index: usize, text: String },
    Delete,
    Export(Option<PathBuf>),
    Model(Option<String>),
    Login(String),
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: /{0}. Type /help for available commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parse a line. Blank lines yield `Ok(None)`.
    pub fn parse(input: &str) -> Result<Option<Self>, CommandError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let Some(rest) = input.strip_prefix('/') else {
            return Ok(Some(Command::Send(input.to_string())));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "new" => Command::New,
            "threads" | "ls" => Command::Threads,
            "switch" => Command::Switch(parse_position(args).ok_or(CommandError::Usage("/switch <n>"))?),
            "rename" => {
                if args.is_empty() {
                    return Err(CommandError::Usage("/rename <title>"));
                }
                Command::Rename(args.to_string())
            }
            "edit" => {
                const USAGE: CommandError = CommandError::Usage("/edit <n> <text>");
                let (position, text) = args.split_once(char::is_whitespace).ok_or(USAGE)?;
                let index = parse_position(position).ok_or(USAGE)?;
                let text = text.trim();
                if text.is_empty() {
                    return Err(USAGE);
                }
                Command::Edit {
                    index,
                    text: text.to_string(),
                }
            }
            "delete" => Command::Delete,
            "export" => Command::Export((!args.is_empty()).then(|| PathBuf::from(args))),
            "model" => Command::Model((!args.is_empty()).then(|| args.to_string())),
            "login" => {
                if args.is_empty() || args.contains(char::is_whitespace) {
                    return Err(CommandError::Usage("/login <user>"));
                }
                Command::Login(args.to_string())
            }
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn parse_position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok().filter(|n| *n > 0)
}
