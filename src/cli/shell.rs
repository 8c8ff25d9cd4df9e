use std::error::Error;
use std::fmt::Display;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::cli::commands::{Context, HISTORY_TITLE, LOGIN_TITLE, REGISTER_TITLE, SHORTEN_TITLE};
use crate::form::controller::SubmissionController;
use crate::form::form_model::Phase;
use crate::remote::remote_model::RemoteAction;
use crate::report::console::{format_fields, format_state};
use crate::session::store::SessionStore;

const SHELL_HELP: &str = "\
commands:
  set <field> <value>   change a field (value may contain spaces)
  submit                send the form
  reset                 clear the error or result
  show                  list the fields and the form state
  logout                forget the session and reset the form
  help                  this text
  quit                  leave the shell";

// ============================================================================
// Intent parsing
// ============================================================================

/// One line of shell input, turned into a form intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellIntent {
    Set { field: String, value: String },
    Submit,
    Reset,
    Show,
    Logout,
    Help,
    Quit,
}

/// Parse a shell line. Blank lines yield `Ok(None)`.
pub fn parse_intent(line: &str) -> Result<Option<ShellIntent>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    let intent = match command.to_ascii_lowercase().as_str() {
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if field.is_empty() {
                return Err("usage: set <field> <value>".to_string());
            }
            ShellIntent::Set {
                field: field.to_string(),
                value: value.trim_start().to_string(),
            }
        }
        "submit" | "s" => ShellIntent::Submit,
        "reset" => ShellIntent::Reset,
        "show" => ShellIntent::Show,
        "logout" => ShellIntent::Logout,
        "help" | "?" => ShellIntent::Help,
        "quit" | "exit" | "q" => ShellIntent::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(intent))
}

// ============================================================================
// shell subcommand
// ============================================================================

pub async fn cmd_shell(ctx: &Context, form: &str) -> Result<(), Box<dyn Error>> {
    match form {
        "register" => run_shell(ctx, ctx.register_form(), REGISTER_TITLE).await,
        "login" => run_shell(ctx, ctx.login_form(), LOGIN_TITLE).await,
        "shorten" => run_shell(ctx, ctx.shorten_form(), SHORTEN_TITLE).await,
        "history" => run_shell(ctx, ctx.history_form(), HISTORY_TITLE).await,
        other => Err(format!(
            "unknown form '{}' (expected register, login, shorten or history)",
            other
        )
        .into()),
    }
}

async fn run_shell<A>(
    ctx: &Context,
    form: SubmissionController<A>,
    title: &str,
) -> Result<(), Box<dyn Error>>
where
    A: RemoteAction + 'static,
    A::Payload: Display,
{
    // Print each phase change as it lands, including outcomes that arrive
    // while the user is still typing.
    let mut updates = form.subscribe();
    let render_title = title.to_string();
    let renderer = tokio::spawn(async move {
        let mut last = Phase::Idle;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.phase == last {
                continue;
            }
            last = snapshot.phase;
            if snapshot.phase == Phase::InFlight || snapshot.phase.is_terminal() {
                print!("{}", format_state(&render_title, &snapshot));
            }
        }
    });

    println!("[{}] {}", title, SHELL_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let intent = match parse_intent(&line) {
            Ok(Some(intent)) => intent,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };
        debug!(form = form.form(), ?intent, "shell intent");

        match intent {
            ShellIntent::Set { field, value } => form.set_field(field, value),
            ShellIntent::Submit => {
                let submitting = form.clone();
                tokio::spawn(async move { submitting.submit().await });
            }
            ShellIntent::Reset => form.reset(),
            ShellIntent::Show => {
                let snapshot = form.snapshot();
                print!("{}", format_fields(&snapshot));
                print!("{}", format_state(title, &snapshot));
            }
            ShellIntent::Logout => {
                ctx.session.clear();
                ctx.save_session()?;
                form.reset();
                println!("Logged out");
            }
            ShellIntent::Help => println!("{}", SHELL_HELP),
            ShellIntent::Quit => break,
        }
    }

    renderer.abort();
    ctx.save_session()?;
    Ok(())
}
