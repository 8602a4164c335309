use reedline::{Completer, Span, Suggestion};

use crate::query_state::SearchField;

pub const COMMANDS: [&str; 10] = [
    "search", "clear", "size", "page", "show", "fields", "export", "\\help", "\\clear", "\\quit",
];

/// Completes command names, and field keys after `search`
#[derive(Default)]
pub struct CommandCompleter;

impl CommandCompleter {
    pub fn new() -> Self {
        Self
    }

    fn candidates(input: &str) -> (Vec<(String, Option<String>)>, &str) {
        let words: Vec<&str> = input.split_whitespace().collect();
        let trailing_space = input.ends_with(char::is_whitespace);

        let (position, partial) = match (words.len(), trailing_space) {
            (0, _) => (0, ""),
            (n, true) => (n, ""),
            (n, false) => (n - 1, words[n - 1]),
        };

        let values = match position {
            0 => COMMANDS.iter().map(|c| (c.to_string(), None)).collect(),
            1 if words[0].eq_ignore_ascii_case("search") => SearchField::ALL
                .iter()
                .map(|f| (f.wire_key().to_string(), Some(f.label().to_string())))
                .collect(),
            _ => Vec::new(),
        };

        (values, partial)
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let input = &line[..pos.min(line.len())];
        let (values, partial) = Self::candidates(input);
        let start_pos = pos.saturating_sub(partial.len());

        values
            .into_iter()
            .filter(|(value, _)| {
                value
                    .to_lowercase()
                    .starts_with(&partial.to_lowercase())
            })
            .map(|(value, description)| Suggestion {
                value,
                description,
                extra: None,
                span: Span {
                    start: start_pos,
                    end: pos,
                },
                style: None,
                append_whitespace: true,
            })
            .collect()
    }
}
