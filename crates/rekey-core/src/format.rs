// Rekey Sequence Formatter
// Renders canonical event streams as human-readable text

use std::fmt::Write;

use crate::key::{name_by_key, KeyEvent, KeyState};

/// Render a sequence as space-separated atoms, each a state prefix followed
/// by the key's canonical name. Action keys render as `Action<N>`.
///
/// Prefixes: `+` Down, `-` Up, `!` Not, `*` DownAsync, `~` UpAsync,
/// `#` DownMatched.
pub fn format_sequence(sequence: &[KeyEvent]) -> String {
    let mut text = String::new();
    for (i, event) in sequence.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push(match event.state {
            KeyState::Down => '+',
            KeyState::Up => '-',
            KeyState::Not => '!',
            KeyState::DownAsync => '*',
            KeyState::UpAsync => '~',
            KeyState::DownMatched => '#',
        });
        if let Some(index) = event.key.action_index() {
            let _ = write!(text, "Action{}", index);
        } else {
            text.push_str(name_by_key(event.key));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    #[test]
    fn test_format_states() {
        let sequence = vec![
            KeyEvent::new(Key(30), KeyState::Down),
            KeyEvent::new(Key(30), KeyState::Up),
            KeyEvent::new(Key(48), KeyState::Not),
            KeyEvent::new(Key(46), KeyState::DownAsync),
            KeyEvent::new(Key(46), KeyState::UpAsync),
            KeyEvent::new(Key(32), KeyState::DownMatched),
        ];
        assert_eq!(format_sequence(&sequence), "+A -A !B *C ~C #D");
    }

    #[test]
    fn test_format_action_key() {
        let sequence = vec![KeyEvent::new(Key::action(0), KeyState::Down)];
        assert_eq!(format_sequence(&sequence), "+Action0");
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_sequence(&[]), "");
    }
}
