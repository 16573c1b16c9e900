// Rekey Core Library
// Configuration parsing and key-sequence algebra for keyboard remapping

pub mod config;
pub mod format;
pub mod key;

pub use config::{
    filter_system_contexts, parse_key_sequence, Action, CommandOutput, Config, Context, Filter,
    Input, ParseError, System,
};
pub use format::format_sequence;
pub use key::{key_by_name, name_by_key, Key, KeyEvent, KeySequence, KeyState};
