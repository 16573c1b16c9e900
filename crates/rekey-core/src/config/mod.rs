// Rekey Config
// Data model for the parsed rule catalog and the system context filter

pub(crate) mod expander;
pub(crate) mod scan;
pub mod sequence_parser;
pub(crate) mod tokenizer;

pub mod parser;

use regex::{Regex, RegexBuilder};

use crate::key::KeySequence;

pub use sequence_parser::parse_key_sequence;

/// Error raised while parsing a configuration. The parse is aborted on the
/// first error; there is no partial configuration.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} in line {line}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// Host operating system tag, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum System {
    Linux,
    Windows,
    MacOS,
}

impl System {
    /// The system this build targets.
    pub const fn current() -> System {
        if cfg!(target_os = "windows") {
            System::Windows
        } else if cfg!(target_os = "macos") {
            System::MacOS
        } else {
            System::Linux
        }
    }

    /// Parse a `system=` filter value. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Option<System> {
        if name.eq_ignore_ascii_case("linux") {
            Some(System::Linux)
        } else if name.eq_ignore_ascii_case("windows") {
            Some(System::Windows)
        } else if name.eq_ignore_ascii_case("macos") {
            Some(System::MacOS)
        } else {
            None
        }
    }
}

/// A terminal action, executed by the external shell runner when the matcher
/// emits the corresponding `Action<N>` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub terminal_command: String,
}

/// One input pattern. `output_index` points into the owning context's
/// `outputs`; inputs bound to a command carry the command's negative index
/// (`-(command_number + 1)`) instead, resolved against `command_outputs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub input: KeySequence,
    pub output_index: i32,
}

/// Per-context output binding of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub name: String,
    pub index: i32,
    pub output: KeySequence,
}

#[derive(Debug, Clone, Default)]
enum FilterMatcher {
    /// Empty filter, matches anything.
    #[default]
    Any,
    Exact(String),
    Substring(String),
    Regex(Regex),
}

/// Window class/title filter. Class filters written as plain strings match
/// exactly, title filters by substring; `/…/` with an optional trailing `i`
/// matches as a regular expression.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// The filter as written in the configuration, for diagnostics.
    pub string: String,
    matcher: FilterMatcher,
}

impl Filter {
    pub(crate) fn exact(value: &str) -> Self {
        Self {
            string: value.to_string(),
            matcher: if value.is_empty() {
                FilterMatcher::Any
            } else {
                FilterMatcher::Exact(value.to_string())
            },
        }
    }

    pub(crate) fn substring(value: &str) -> Self {
        Self {
            string: value.to_string(),
            matcher: if value.is_empty() {
                FilterMatcher::Any
            } else {
                FilterMatcher::Substring(value.to_string())
            },
        }
    }

    /// Compile a `/pattern/` filter. `source` keeps the delimiters for
    /// diagnostics.
    pub(crate) fn regex(source: &str, pattern: &str, case_insensitive: bool) -> Result<Self, String> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|_| format!("Invalid regular expression '{}'", source))?;
        Ok(Self {
            string: source.to_string(),
            matcher: FilterMatcher::Regex(regex),
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.matcher {
            FilterMatcher::Any => true,
            FilterMatcher::Exact(text) => value == text,
            FilterMatcher::Substring(text) => value.contains(text),
            FilterMatcher::Regex(regex) => regex.is_match(value),
        }
    }
}

/// A gated block of mappings, active when its window filters match. The
/// first context of a configuration is the default context.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Raw `system=` value, if the context declared one.
    pub system_filter: Option<String>,
    pub window_class_filter: Filter,
    pub window_title_filter: Filter,
    /// Raw `modifier=` list, if declared. Its semantics are already compiled
    /// into every input pattern of this context.
    pub modifier_filter: Option<String>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<KeySequence>,
    pub command_outputs: Vec<CommandOutput>,
}

impl Context {
    /// True when both window filters accept the focused window.
    pub fn matches(&self, window_class: &str, window_title: &str) -> bool {
        self.window_class_filter.matches(window_class)
            && self.window_title_filter.matches(window_title)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.command_outputs.is_empty()
    }

    fn matches_system(&self, system: System) -> bool {
        match &self.system_filter {
            None => true,
            Some(name) => System::from_name(name) == Some(system),
        }
    }
}

/// The parsed rule catalog. Built once by [`Config::parse`] and immutable
/// afterwards; safe to share read-only across threads.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub actions: Vec<Action>,
    pub contexts: Vec<Context>,
}

impl Config {
    /// Parse a configuration for the build's host system.
    pub fn parse(text: &str) -> Result<Config, ParseError> {
        Self::parse_with_system(text, System::current())
    }

    /// Parse a configuration for an explicit host system.
    pub fn parse_with_system(text: &str, system: System) -> Result<Config, ParseError> {
        parser::ConfigParser::new(system).parse(text)
    }
}

/// Drop contexts whose `system=` filter does not match `system`. The default
/// context is always preserved. Applying the filter twice is a no-op.
pub fn filter_system_contexts(config: &mut Config, system: System) {
    let mut index = 0;
    config
        .contexts
        .retain(|context| {
            let keep = index == 0 || context.matches_system(system);
            index += 1;
            keep
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_exact() {
        let filter = Filter::exact("firefox");
        assert!(filter.matches("firefox"));
        assert!(!filter.matches("_firefox_"));
        assert!(!filter.matches("Firefox"));
    }

    #[test]
    fn test_filter_substring() {
        let filter = Filter::substring("fire");
        assert!(filter.matches("firefox"));
        assert!(filter.matches("_fire_"));
        assert!(!filter.matches("FIRE"));
    }

    #[test]
    fn test_empty_filter_matches_anything() {
        assert!(Filter::exact("").matches("anything"));
        assert!(Filter::substring("").matches(""));
        assert!(Filter::default().matches("x"));
    }

    #[test]
    fn test_filter_regex() {
        let filter = Filter::regex("/^Base\\d+$/", "^Base\\d+$", false).unwrap();
        assert!(filter.matches("Base100"));
        assert!(!filter.matches("Base100_"));
        assert_eq!(filter.string, "/^Base\\d+$/");
    }

    #[test]
    fn test_filter_regex_case_insensitive() {
        let filter = Filter::regex("/title3/", "title3", true).unwrap();
        assert!(filter.matches("Title3"));
        assert!(filter.matches("title3"));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        assert!(Filter::regex("/Linux(/", "Linux(", false).is_err());
    }

    #[test]
    fn test_system_from_name() {
        assert_eq!(System::from_name("linux"), Some(System::Linux));
        assert_eq!(System::from_name("Windows"), Some(System::Windows));
        assert_eq!(System::from_name("MACOS"), Some(System::MacOS));
        assert_eq!(System::from_name("beos"), None);
    }

    #[test]
    fn test_context_matches() {
        let context = Context {
            window_class_filter: Filter::exact("Class4"),
            window_title_filter: Filter::substring("Title4"),
            ..Context::default()
        };
        assert!(context.matches("Class4", "_Title4_"));
        assert!(!context.matches("_Class4_", "Title4"));
        assert!(!context.matches("Class4", "title4"));
    }
}
