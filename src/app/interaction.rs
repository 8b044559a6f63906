use super::keys::KeyWatcher;
use crate::executor::CancellationToken;
use crossterm::tty::IsTty;
use std::io::{self, BufRead, Write};

/// User-facing prompts and output. `None` from a prompt means the user
/// cancelled or input ended.
pub trait Interaction {
    fn show(&mut self, text: &str);

    /// A line of command output while a command runs.
    fn progress(&mut self, _line: &str) {}

    fn confirm(&mut self, prompt: &str) -> Option<bool>;

    /// Indices into `options` the user picked.
    fn select(&mut self, prompt: &str, options: &[String]) -> Option<Vec<usize>>;

    /// Free-text answer. An empty answer yields `default` when one is given.
    fn ask(&mut self, prompt: &str, default: Option<&str>) -> Option<String>;

    /// Commands are about to run; a cancel request from the user should set
    /// `cancel` until `stop_watching` is called.
    fn watch_cancel(&mut self, _cancel: &CancellationToken) {}

    fn stop_watching(&mut self) {}
}

/// Line-oriented console over any reader and writer. On a terminal, Esc or
/// Ctrl-C cancels running commands.
pub struct Console<R, W> {
    input: R,
    output: W,
    terminal: bool,
    keys: Option<KeyWatcher>,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let mut console = Self::new(stdin.lock(), io::stdout());
        console.terminal = stdin.is_tty();
        console
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            terminal: false,
            keys: None,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.keys.is_some()
    }

    fn line(&mut self, text: &str) {
        if self.keys.is_some() {
            // Raw mode does not translate newlines.
            let _ = write!(self.output, "{}\r\n", text.replace('\n', "\r\n"));
            let _ = self.output.flush();
        } else {
            let _ = writeln!(self.output, "{text}");
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, text: &str) -> Option<String> {
        let _ = write!(self.output, "{text}");
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

/// Parses `1`, `1,3` or `1 3` into zero-based indices below `count`.
pub(crate) fn parse_selection(raw: &str, count: usize) -> Option<Vec<usize>> {
    let mut picked = Vec::new();
    for token in raw
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        let number: usize = token.parse().ok()?;
        if number == 0 || number > count {
            return None;
        }
        if !picked.contains(&(number - 1)) {
            picked.push(number - 1);
        }
    }
    if picked.is_empty() {
        None
    } else {
        Some(picked)
    }
}

impl<R: BufRead, W: Write> Interaction for Console<R, W> {
    fn show(&mut self, text: &str) {
        self.line(text);
    }

    fn progress(&mut self, line: &str) {
        self.line(&format!("  {line}"));
    }

    fn confirm(&mut self, prompt: &str) -> Option<bool> {
        loop {
            let answer = self.prompt(&format!("{prompt} [Y/n] "))?;
            match answer.to_ascii_lowercase().as_str() {
                "" | "y" | "yes" => return Some(true),
                "n" | "no" => return Some(false),
                _ => self.show("Please answer yes or no."),
            }
        }
    }

    fn select(&mut self, prompt: &str, options: &[String]) -> Option<Vec<usize>> {
        self.show(prompt);
        for (index, option) in options.iter().enumerate() {
            self.show(&format!("  {}) {option}", index + 1));
        }
        loop {
            let answer = self.prompt("Choose: ")?;
            match parse_selection(&answer, options.len()) {
                Some(picked) => return Some(picked),
                None => self.show(&format!(
                    "Enter a number between 1 and {}.",
                    options.len()
                )),
            }
        }
    }

    fn ask(&mut self, prompt: &str, default: Option<&str>) -> Option<String> {
        let label = match default {
            Some(default) if !default.is_empty() => format!("{prompt} [{default}]: "),
            _ => format!("{prompt}: "),
        };
        let answer = self.prompt(&label)?;
        match default {
            Some(default) if answer.is_empty() => Some(default.to_string()),
            _ => Some(answer),
        }
    }

    fn watch_cancel(&mut self, cancel: &CancellationToken) {
        if !self.terminal || self.keys.is_some() {
            return;
        }
        match KeyWatcher::start(cancel.clone()) {
            Ok(watcher) => {
                self.keys = Some(watcher);
                self.show("Press Esc to cancel.");
            }
            Err(err) => self.show(&format!("Cancellation is unavailable: {err}")),
        }
    }

    fn stop_watching(&mut self) {
        self.keys = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn confirm_retries_until_yes_or_no() {
        let mut console = console("maybe\nn\n");
        assert_eq!(console.confirm("Proceed?"), Some(false));
        let output = String::from_utf8(console.into_output()).expect("utf8");
        assert!(output.contains("Please answer yes or no."));
    }

    #[test]
    fn end_of_input_cancels() {
        assert_eq!(console("").confirm("Proceed?"), None);
        assert_eq!(console("").ask("Name", Some("x")), None);
    }

    #[test]
    fn ask_returns_default_on_empty_answer() {
        assert_eq!(
            console("\n").ask("Model", Some("claude-haiku-4-5")).as_deref(),
            Some("claude-haiku-4-5")
        );
    }

    #[test]
    fn piped_input_never_enters_raw_mode() {
        let mut console = console("");
        let cancel = CancellationToken::new();
        console.watch_cancel(&cancel);
        assert!(!console.is_watching());
        console.show("still line mode");
        console.stop_watching();
        assert_eq!(
            String::from_utf8(console.into_output()).expect("utf8"),
            "still line mode\n"
        );
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn selection_accepts_lists_and_rejects_out_of_range() {
        assert_eq!(parse_selection("2", 3), Some(vec![1]));
        assert_eq!(parse_selection("1, 3 1", 3), Some(vec![0, 2]));
        assert_eq!(parse_selection("4", 3), None);
        assert_eq!(parse_selection("", 3), None);
        let mut console = console("9\n2\n");
        assert_eq!(
            console.select("Environment", &["staging".to_string(), "prod".to_string()]),
            Some(vec![1])
        );
    }
}
