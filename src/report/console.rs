use std::fmt;

use crate::form::form_model::{Phase, StateSnapshot};
use crate::remote::remote_model::History;

// ============================================================================
// Console renderer: terminal view of a form state
// ============================================================================

/// Render one form snapshot for the terminal.
///
/// Produces output like:
/// ```text
/// [Shorten] submitting...
/// [Shorten] ✓ http://localhost:8080/aZ3x9
/// [Sign up] ✗ 2 problems:
///     - Password must be at least 8 characters long
///     - Passwords do not match
/// ```
pub fn format_state<P: fmt::Display>(title: &str, snapshot: &StateSnapshot<P>) -> String {
    let mut out = String::new();

    match snapshot.phase {
        Phase::Idle => out.push_str(&format!("[{}] ready\n", title)),
        Phase::Validating => out.push_str(&format!("[{}] checking input...\n", title)),
        Phase::InFlight => out.push_str(&format!("[{}] submitting...\n", title)),
        Phase::Succeeded => match &snapshot.result {
            Some(result) => {
                let text = result.to_string();
                if text.contains('\n') {
                    out.push_str(&format!("[{}] \u{2713} done\n{}", title, text));
                    if !text.ends_with('\n') {
                        out.push('\n');
                    }
                } else {
                    out.push_str(&format!("[{}] \u{2713} {}\n", title, text));
                }
            }
            None => out.push_str(&format!("[{}] \u{2713} done\n", title)),
        },
        Phase::Failed => {
            let message = snapshot.error_message().unwrap_or_default();
            let lines: Vec<&str> = message.lines().collect();
            if lines.len() > 1 {
                out.push_str(&format!("[{}] \u{2717} {} problems:\n", title, lines.len()));
                for line in lines {
                    out.push_str(&format!("    - {}\n", line));
                }
            } else {
                out.push_str(&format!("[{}] \u{2717} {}\n", title, message));
            }
        }
    }

    out
}

/// Field values of a snapshot, one per line. Password fields are masked.
pub fn format_fields<P>(snapshot: &StateSnapshot<P>) -> String {
    if snapshot.fields.is_empty() {
        return "  (no fields set)\n".to_string();
    }

    let width = snapshot
        .fields
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (name, value) in snapshot.fields.iter() {
        let shown = if name.contains("password") {
            "*".repeat(value.chars().count())
        } else {
            value.to_string()
        };
        out.push_str(&format!("  {:<width$} = {}\n", name, shown, width = width));
    }
    out
}

/// One-line session summary for `status`.
pub fn format_session(authenticated: bool, has_token: bool) -> String {
    match (authenticated, has_token) {
        (true, true) => "Logged in\n".to_string(),
        (true, false) => "Logged in (no token cookie stored)\n".to_string(),
        (false, _) => "Not logged in\n".to_string(),
    }
}

// ============================================================================
// History table
// ============================================================================

const HISTORY_HEADERS: [&str; 3] = ["Short URL", "Long URL", "Expiration Date"];

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No shortened links yet");
        }

        let rows: Vec<[&str; 3]> = self
            .0
            .iter()
            .map(|e| [e.short_url.as_str(), e.long_url.as_str(), e.expiration_date.as_str()])
            .collect();

        let mut widths = HISTORY_HEADERS.map(|h| h.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        write_row(f, &HISTORY_HEADERS, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &rows {
            write_row(f, row, &widths)?;
        }
        Ok(())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[&str; 3], widths: &[usize; 3]) -> fmt::Result {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    writeln!(f, "{}", padded.join(" | ").trim_end())
}
