//! Line-oriented terminal front end for the review loop.

use review_core::{Action, InteractionSource, Presenter, ServeSource, ServedItem};
use std::io::{BufRead, Write};

pub const HELP: &str =
    "enter/n next, b back, s speech, l listen, g group, d delete, q quit";

/// Map one input line to an action. Unknown input yields `None`.
pub fn parse_action(line: &str) -> Option<Action> {
    let line = line.trim().to_lowercase();
    match line.as_str() {
        "" | "n" => Some(Action::Next),
        "b" | "p" => Some(Action::Back),
        "q" => Some(Action::Quit),
        "d" | "x" => Some(Action::Delete),
        "s" => Some(Action::Speech),
        "l" => Some(Action::Listen),
        "g" | "a" => Some(Action::AddToGroup),
        other => Action::from_name(other),
    }
}

/// Reads actions from a line source. End of input quits.
pub struct TerminalInput<R> {
    reader: R,
}

impl<R: BufRead> TerminalInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> InteractionSource for TerminalInput<R> {
    fn wait_action(&mut self) -> Action {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return Action::Quit,
                Ok(_) => match parse_action(&line) {
                    Some(action) => return action,
                    None => eprintln!("{HELP}"),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read input");
                    return Action::Quit;
                }
            }
        }
    }
}

/// Writes items and status lines. Speech and listen print the text, there is
/// no audio backend.
pub struct TerminalPresenter<W> {
    out: W,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write output");
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show(&mut self, item: &ServedItem) {
        let marker = match item.source {
            ServeSource::Pool => "",
            ServeSource::Group => "(again) ",
            ServeSource::Backward => "(back) ",
            ServeSource::Listen => "(listen) ",
        };
        self.emit(&format!("\n{marker}[{}] {}", item.round, item.text));
    }

    fn show_empty(&mut self) {
        self.emit("\nempty.");
    }

    fn set_status(&mut self, status: &str) {
        self.emit(&format!("-- {status}"));
    }

    fn speak(&mut self, item: &ServedItem) {
        self.emit(&format!("~ {}", item.text));
    }

    fn listen(&mut self, playlist: &[ServedItem]) {
        for item in playlist {
            self.emit(&format!("~ {}", item.text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use review_core::Fingerprint;

    #[test]
    fn keys_and_names_map_to_actions() {
        assert_eq!(parse_action("\n"), Some(Action::Next));
        assert_eq!(parse_action(" B "), Some(Action::Back));
        assert_eq!(parse_action("add-to-group"), Some(Action::AddToGroup));
        assert_eq!(parse_action("quit"), Some(Action::Quit));
        assert_eq!(parse_action("zz"), None);
    }

    #[test]
    fn input_skips_unknown_lines_and_quits_at_eof() {
        let mut input = TerminalInput::new("zz\nd\n".as_bytes());
        assert_eq!(input.wait_action(), Action::Delete);
        assert_eq!(input.wait_action(), Action::Quit);
    }

    #[test]
    fn presenter_marks_sources() {
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.show(&ServedItem {
            fingerprint: Fingerprint(1),
            text: "hello".to_string(),
            round: 2,
            source: ServeSource::Group,
        });
        presenter.set_status("words.txt - 3");
        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(out, "\n(again) [2] hello\n-- words.txt - 3\n");
    }
}
