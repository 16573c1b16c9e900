// Rekey Config Tokenizer
// Splits the input stream into logical statements

use crate::config::ParseError;

/// One logical statement with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    pub line: usize,
    pub text: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Normal,
    Str(char),
    Regex,
}

/// Split `input` into statements.
///
/// A newline ends the current statement unless it falls inside `(…)`, `{…}`,
/// `[…]`, `$(…)` or a quoted `"…"`/`'…'`/`/…/` region. Comments run from `#`
/// or `;` to the end of the line, except inside quoted regions and shell
/// blocks. `/` opens a regex region only inside a `[…]` context header.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Statement>, ParseError> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;
    let mut line = 1;
    let mut mode = Mode::Normal;
    let mut paren_depth = 0usize;
    let mut brace_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut shell_depth = 0usize;

    let mut flush = |current: &mut String, start_line: usize, statements: &mut Vec<Statement>| {
        let text = current.trim();
        if !text.is_empty() {
            statements.push(Statement {
                line: start_line,
                text: text.to_string(),
            });
        }
        current.clear();
    };

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        match mode {
            Mode::Str(quote) => {
                current.push(c);
                if c == quote {
                    mode = Mode::Normal;
                }
            }
            Mode::Regex => {
                current.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            line += 1;
                        }
                        current.push(escaped);
                    }
                } else if c == '/' {
                    mode = Mode::Normal;
                }
            }
            Mode::Normal if shell_depth > 0 => {
                current.push(c);
                if c == '(' {
                    shell_depth += 1;
                } else if c == ')' {
                    shell_depth -= 1;
                }
            }
            Mode::Normal => match c {
                '#' | ';' => {
                    while chars.peek().is_some_and(|&n| n != '\n') {
                        chars.next();
                    }
                }
                '"' | '\'' => {
                    current.push(c);
                    mode = Mode::Str(c);
                }
                '/' if bracket_depth > 0 => {
                    current.push(c);
                    mode = Mode::Regex;
                }
                '$' if chars.peek() == Some(&'(') => {
                    chars.next();
                    current.push_str("$(");
                    shell_depth = 1;
                }
                '\n' => {
                    if paren_depth == 0 && brace_depth == 0 && bracket_depth == 0 {
                        flush(&mut current, start_line, &mut statements);
                        start_line = line;
                    } else {
                        current.push('\n');
                    }
                }
                _ => {
                    match c {
                        '(' => paren_depth += 1,
                        ')' => paren_depth = paren_depth.saturating_sub(1),
                        '{' => brace_depth += 1,
                        '}' => brace_depth = brace_depth.saturating_sub(1),
                        '[' => bracket_depth += 1,
                        ']' => bracket_depth = bracket_depth.saturating_sub(1),
                        _ => {}
                    }
                    current.push(c);
                }
            },
        }
    }

    match mode {
        Mode::Str(_) => return Err(ParseError::new("Unterminated string", line)),
        Mode::Regex => return Err(ParseError::new("Unterminated regular expression", line)),
        Mode::Normal => {}
    }
    if shell_depth > 0 {
        return Err(ParseError::new("Unterminated terminal command", line));
    }
    flush(&mut current, start_line, &mut statements);

    Ok(statements)
}
