use std::io::Write;

use anyhow::bail;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use sf_core::onboarding::SessionSnapshot;
use sf_core::security::SecretString;

use super::render;

/// Line-based input with a label printed before each read.
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    pub async fn ask(&mut self, label: &str) -> anyhow::Result<String> {
        print!("{label}: ");
        std::io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => bail!("input closed"),
        }
    }

    /// Empty answer means "not provided".
    pub async fn ask_optional(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        let answer = self.ask(&format!("{label} (optional)")).await?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }

    /// Secrets are read as plain lines; the value goes straight into a `SecretString`.
    pub async fn ask_secret(&mut self, label: &str) -> anyhow::Result<SecretString> {
        self.ask(label).await.map(SecretString::new)
    }

    /// `true` unless the answer starts with `n`.
    pub async fn confirm(&mut self, label: &str) -> anyhow::Result<bool> {
        let answer = self.ask(&format!("{label} [Y/n]")).await?;
        Ok(!answer.to_ascii_lowercase().starts_with('n'))
    }
}

/// Where snapshots go: a summary for people, JSON lines for scripts.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    pub json: bool,
}

impl Console {
    pub fn show(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(snapshot)?);
        } else {
            println!("{}", render::summary(snapshot));
        }
        Ok(())
    }

    pub fn say(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }
}
