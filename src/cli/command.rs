//! One line of user input, parsed.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty line: the stage's main action.
    Continue,
    /// Code characters typed or pasted in one go.
    Digits(String),
    /// Backspace on a slot; `None` means the focused slot.
    Delete(Option<usize>),
    Submit,
    Resend,
    Retry,
    Back,
    Restart,
    Confirm,
    Skip,
    Provider(String),
    Manual,
    Status,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Continue;
    }
    if line.chars().all(|c| c.is_ascii_digit()) {
        return Command::Digits(line.to_string());
    }

    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or_default().to_ascii_lowercase();
    let arg = words.next();
    match (head.as_str(), arg) {
        ("del" | "delete", None) => Command::Delete(None),
        ("del" | "delete", Some(slot)) => match slot.parse::<usize>() {
            Ok(slot) if slot >= 1 => Command::Delete(Some(slot - 1)),
            _ => Command::Unknown(line.to_string()),
        },
        ("submit", _) => Command::Submit,
        ("resend", _) => Command::Resend,
        ("retry", _) => Command::Retry,
        ("back", _) => Command::Back,
        ("restart", _) => Command::Restart,
        ("confirm", _) => Command::Confirm,
        ("skip", _) => Command::Skip,
        ("provider", Some(name)) => Command::Provider(name.to_string()),
        ("manual", _) => Command::Manual,
        ("status", _) => Command::Status,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}
