use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::{Result, bail};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use peak_application::{PeakClient, SendOutcome};
use peak_core::chat::{Message, MessageRole};

/// rustyline helper completing and hinting the in-chat slash commands.
#[derive(Clone)]
struct ChatHelper {
    commands: Vec<String>,
}

impl ChatHelper {
    fn new() -> Self {
        Self {
            commands: ["/history", "/new", "/help", "/quit"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for ChatHelper {}

fn print_message(message: &Message) {
    match message.role {
        MessageRole::User => println!("{}", format!("> {}", message.content).green()),
        MessageRole::Assistant => {
            for line in message.content.lines() {
                println!("{}", line.bright_blue());
            }
            println!();
        }
    }
}

fn print_help() {
    println!("{}", "/history  show this conversation".bright_black());
    println!("{}", "/new      start a new conversation".bright_black());
    println!("{}", "/quit     leave the chat".bright_black());
}

/// Interactive chat loop.
///
/// A message that fails to send is put back on the prompt so it can be
/// edited and sent again.
pub async fn run(client: &PeakClient, conversation: Option<&str>) -> Result<()> {
    if !client.auth().is_authenticated().await {
        bail!("Not signed in. Run `peak login` first.");
    }

    let mut session = match conversation {
        Some(id) => client.conversations().open(id).await?,
        None => client.conversations().start(),
    };

    println!("{}", "=== PeakState Coach ===".bright_magenta().bold());
    println!(
        "{}",
        "Type a message, '/help' for commands, or '/quit' to exit.".bright_black()
    );
    println!();
    for message in session.messages() {
        print_message(&message);
    }

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ChatHelper::new()));
    let mut restore = String::new();

    loop {
        let readline = rl.readline_with_initial(">> ", (&restore, ""));
        restore.clear();

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                match trimmed {
                    "" => continue,
                    "/quit" | "/exit" => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    "/help" => print_help(),
                    "/history" => session.messages().iter().for_each(print_message),
                    "/new" => {
                        session = client.conversations().start();
                        println!("{}", "Started a new conversation.".bright_black());
                    }
                    content => {
                        let _ = rl.add_history_entry(content);
                        println!("{}", "...".bright_black());

                        match session.send_message(content).await {
                            Ok(SendOutcome::Sent(exchange)) => {
                                print_message(&exchange.assistant_message)
                            }
                            Ok(SendOutcome::Rejected) => {
                                println!("{}", "Still sending the previous message.".yellow())
                            }
                            Err(err) => {
                                eprintln!("{}", format!("Message not sent: {}", err.source).red());
                                if err.source.requires_reauthentication() {
                                    return Err(err.source.into());
                                }
                                restore = err.content;
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
