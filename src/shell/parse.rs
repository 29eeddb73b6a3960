/// A command line split into words.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ParsedLine {
    pub(crate) args: Vec<String>,
    /// The line ended with `&`.
    pub(crate) background: bool,
}

impl ParsedLine {
    pub(crate) fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Split `line` on whitespace. Trailing `&`s, on their own or glued to the last word, ask for
/// the job to run in the background and are not part of the arguments.
pub(crate) fn parse(line: &str) -> ParsedLine {
    let mut args: Vec<String> = line.split_whitespace().map(str::to_string).collect();

    let mut background = false;
    while let Some(last) = args.last_mut() {
        let kept = last.trim_end_matches('&').len();
        if kept == last.len() {
            break;
        }
        background = true;
        last.truncate(kept);
        if last.is_empty() {
            args.pop();
        }
    }

    ParsedLine { args, background }
}
