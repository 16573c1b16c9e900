// Rekey Sequence Parser
// Lowers one key-sequence expression into the canonical event stream

use smallvec::SmallVec;

use crate::config::scan::Scanner;
use crate::config::ParseError;
use crate::key::{Key, KeyEvent, KeySequence, KeyState};

/// Name resolution and action allocation for one sequence parse.
///
/// The config parser implements this to add logical-key names and to
/// allocate `Action<N>` keys for `$(…)` blocks. The plain table resolver is
/// used when parsing a sequence outside of a configuration.
pub(crate) trait KeyResolver {
    fn resolve_key(&self, name: &str) -> Option<Key>;

    /// Allocate an action key for a terminal command, `None` if terminal
    /// commands are not available in this context.
    fn add_terminal_command(&mut self, _command: &str) -> Option<Key> {
        None
    }
}

/// Resolver backed by the static key table only.
pub(crate) struct TableResolver;

impl KeyResolver for TableResolver {
    fn resolve_key(&self, name: &str) -> Option<Key> {
        crate::key::key_by_name(name)
    }
}

/// Parse a single key-sequence expression.
///
/// `is_input` selects the input-side lowering (async release markers) over
/// the output-side one (explicit releases). Only the static key table is
/// consulted; terminal commands and logical keys require a full
/// configuration parse.
pub fn parse_key_sequence(text: &str, is_input: bool) -> Result<KeySequence, ParseError> {
    parse_sequence(text, is_input, &mut TableResolver)
        .map_err(|message| ParseError::new(message, 1))
}

pub(crate) fn parse_sequence<R: KeyResolver + ?Sized>(
    text: &str,
    is_input: bool,
    resolver: &mut R,
) -> Result<KeySequence, String> {
    let mut lowering = Lowering::new(is_input);
    let mut scanner = Scanner::new(text);

    loop {
        scanner.skip_space();
        let Some(c) = scanner.peek() else { break };
        match c {
            '!' => {
                scanner.advance();
                if !lowering.in_together_group {
                    lowering.flush_key_buffer(true);
                    lowering.release_loose();
                }
                scanner.skip_space();
                let name = scanner.read_ident();
                if name.is_empty() {
                    return Err("Key name expected after '!'".into());
                }
                let key = lowering.resolve(&*resolver, name)?;
                lowering.sequence.push(KeyEvent::new(key, KeyState::Not));
            }
            '$' => {
                scanner.advance();
                if !scanner.skip("(") {
                    return Err("Expected '(' after '$'".into());
                }
                if lowering.is_input {
                    return Err("Terminal command not allowed in input".into());
                }
                if lowering.in_together_group || !lowering.brace_scopes.is_empty() {
                    return Err("Terminal command not allowed inside a group".into());
                }
                lowering.flush_key_buffer(true);
                lowering.release_loose();
                let command = read_balanced(&mut scanner)?;
                let key = resolver
                    .add_terminal_command(command)
                    .ok_or_else(|| "Unexpected '$('".to_string())?;
                lowering.sequence.push(KeyEvent::new(key, KeyState::Down));
            }
            '(' => {
                scanner.advance();
                if lowering.in_together_group {
                    return Err("Unexpected '('".into());
                }
                lowering.flush_key_buffer(true);
                lowering.release_loose();
                lowering.in_together_group = true;
            }
            ')' => {
                scanner.advance();
                if !lowering.in_together_group {
                    return Err("Unexpected ')'".into());
                }
                if lowering.is_input {
                    for &key in &lowering.key_buffer {
                        lowering.sequence.push(KeyEvent::new(key, KeyState::DownAsync));
                    }
                }
                lowering.flush_key_buffer(false);
                lowering.in_together_group = false;
            }
            '{' => {
                scanner.advance();
                if lowering.in_together_group {
                    return Err("Unexpected '{'".into());
                }
                let held_from = lowering.keys_not_up.len();
                lowering.flush_key_buffer(false);
                let inner_from = lowering.keys_not_up.len();
                lowering.brace_scopes.push((held_from, inner_from));
            }
            '}' => {
                scanner.advance();
                if lowering.in_together_group || lowering.brace_scopes.is_empty() {
                    return Err("Unexpected '}'".into());
                }
                lowering.flush_key_buffer(true);
                lowering.close_brace_scope();
            }
            c if crate::config::scan::is_ident_char(c) => {
                if !lowering.in_together_group {
                    lowering.flush_key_buffer(true);
                    lowering.release_loose();
                }
                let name = scanner.read_ident();
                let key = lowering.resolve(&*resolver, name)?;
                lowering.key_buffer.push(key);
            }
            other => return Err(format!("Unexpected '{}'", other)),
        }
    }

    if lowering.in_together_group {
        return Err("Expected ')'".into());
    }
    if !lowering.brace_scopes.is_empty() {
        return Err("Expected '}'".into());
    }
    lowering.flush_key_buffer(true);
    lowering.release_all();
    Ok(lowering.sequence)
}

/// Read shell text up to the matching `)`, counting nested parentheses.
fn read_balanced<'a>(scanner: &mut Scanner<'a>) -> Result<&'a str, String> {
    let rest = scanner.rest();
    let mut level = 1usize;
    for (offset, c) in rest.char_indices() {
        match c {
            '(' => level += 1,
            ')' => {
                level -= 1;
                if level == 0 {
                    let body = &rest[..offset];
                    scanner.skip(&rest[..offset + 1]);
                    return Ok(body);
                }
            }
            _ => {}
        }
    }
    Err("Unterminated terminal command".into())
}

// Lowering state: `key_buffer` holds keys of the current position not yet
// emitted, `keys_not_up` the pressed keys whose release is still pending.
// A brace scope records which `keys_not_up` entries it holds (pressed before
// the brace) and where the keys pressed inside it start.
struct Lowering {
    is_input: bool,
    sequence: KeySequence,
    keys_not_up: SmallVec<[Key; 8]>,
    key_buffer: SmallVec<[Key; 4]>,
    brace_scopes: SmallVec<[(usize, usize); 4]>,
    in_together_group: bool,
}

impl Lowering {
    fn new(is_input: bool) -> Self {
        Self {
            is_input,
            sequence: KeySequence::new(),
            keys_not_up: SmallVec::new(),
            key_buffer: SmallVec::new(),
            brace_scopes: SmallVec::new(),
            in_together_group: false,
        }
    }

    fn resolve<R: KeyResolver + ?Sized>(&self, resolver: &R, name: &str) -> Result<Key, String> {
        resolver
            .resolve_key(name)
            .ok_or_else(|| format!("Invalid key '{}'", name))
    }

    fn up_state(&self) -> KeyState {
        if self.is_input {
            KeyState::UpAsync
        } else {
            KeyState::Up
        }
    }

    /// Emit a press for every buffered key. With `up_immediately` the release
    /// marker follows directly, otherwise the key joins `keys_not_up`.
    fn flush_key_buffer(&mut self, up_immediately: bool) {
        let up = self.up_state();
        for key in std::mem::take(&mut self.key_buffer) {
            self.sequence.push(KeyEvent::new(key, KeyState::Down));
            if up_immediately {
                self.sequence.push(KeyEvent::new(key, up));
            } else {
                self.keys_not_up.push(key);
            }
        }
    }

    /// Release pressed keys not held by any open brace scope, in press order.
    fn release_loose(&mut self) {
        let floor = self.brace_scopes.last().map(|s| s.1).unwrap_or(0);
        let up = self.up_state();
        for key in self.keys_not_up.drain(floor..) {
            self.sequence.push(KeyEvent::new(key, up));
        }
    }

    /// Close the innermost brace scope: release the keys pressed inside it,
    /// then the keys it was holding. The input side releases in press order,
    /// the output side unwinds in reverse.
    fn close_brace_scope(&mut self) {
        let (held_from, inner_from) = self.brace_scopes.pop().unwrap();
        let up = self.up_state();
        let inner: SmallVec<[Key; 4]> = self.keys_not_up.drain(inner_from..).collect();
        let held: SmallVec<[Key; 4]> = self.keys_not_up.drain(held_from..).collect();
        if self.is_input {
            for &key in inner.iter().chain(held.iter()) {
                self.sequence.push(KeyEvent::new(key, up));
            }
        } else {
            for &key in inner.iter().rev().chain(held.iter().rev()) {
                self.sequence.push(KeyEvent::new(key, up));
            }
        }
    }

    /// End of expression: release everything still pressed, in press order.
    fn release_all(&mut self) {
        let up = self.up_state();
        for key in std::mem::take(&mut self.keys_not_up) {
            self.sequence.push(KeyEvent::new(key, up));
        }
    }
}
