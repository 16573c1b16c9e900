// Rekey Config Parser
// Lowers the surface language into the rule catalog

use std::collections::HashMap;

use crate::config::expander::{expand_logical_keys, LogicalKey};
use crate::config::scan::{is_ident, is_ident_char, Scanner};
use crate::config::sequence_parser::{parse_sequence, KeyResolver};
use crate::config::tokenizer::tokenize;
use crate::config::{
    filter_system_contexts, Action, CommandOutput, Config, Context, Filter, Input, ParseError,
    System,
};
use crate::key::{key_by_name, Key, KeyEvent, KeySequence, KeyState};

/// A command introduced by an `input >> command` mapping. Command outputs are
/// addressed by a negative index so they stay distinguishable from direct
/// output indices.
struct Command {
    name: String,
    index: i32,
    mapped: bool,
}

enum FilterStyle {
    Exact,
    Substring,
}

/// Single-use parser for one configuration text. All tables below live only
/// for the duration of the parse; the returned [`Config`] is self-contained.
pub(crate) struct ConfigParser {
    system: System,
    config: Config,
    macros: HashMap<String, String>,
    logical_keys: Vec<LogicalKey>,
    commands: Vec<Command>,
    context_modifier: KeySequence,
    current_context: usize,
    line: usize,
}

impl KeyResolver for ConfigParser {
    fn resolve_key(&self, name: &str) -> Option<Key> {
        self.key_by_name(name)
    }

    fn add_terminal_command(&mut self, command: &str) -> Option<Key> {
        let key = Key::action(self.config.actions.len());
        self.config.actions.push(Action {
            terminal_command: command.to_string(),
        });
        Some(key)
    }
}

impl ConfigParser {
    pub fn new(system: System) -> Self {
        Self {
            system,
            config: Config::default(),
            macros: HashMap::new(),
            logical_keys: Vec::new(),
            commands: Vec::new(),
            context_modifier: KeySequence::new(),
            current_context: 0,
            line: 1,
        }
    }

    pub fn parse(mut self, text: &str) -> Result<Config, ParseError> {
        self.config.contexts.push(Context::default());
        self.register_builtin_logical_keys();

        for statement in tokenize(text)? {
            self.line = statement.line;
            self.parse_statement(&statement.text)
                .map_err(|message| ParseError::new(message, self.line))?;
        }

        self.finalize()
    }

    fn register_builtin_logical_keys(&mut self) {
        for (name, both, left, right) in [
            ("Shift", Key::SHIFT, Key::SHIFT_LEFT, Key::SHIFT_RIGHT),
            ("Ctrl", Key::CTRL, Key::CONTROL_LEFT, Key::CONTROL_RIGHT),
            ("Meta", Key::META, Key::META_LEFT, Key::META_RIGHT),
        ] {
            self.logical_keys.push(LogicalKey {
                name: name.to_string(),
                both,
                left,
                right,
            });
        }
    }

    /// Key lookup used everywhere during the parse: the static table first,
    /// then user-defined logical keys by name.
    fn key_by_name(&self, name: &str) -> Option<Key> {
        if let Some(key) = key_by_name(name) {
            return Some(key);
        }
        self.logical_keys
            .iter()
            .find(|logical| logical.name == name)
            .map(|logical| logical.both)
    }

    fn parse_statement(&mut self, text: &str) -> Result<(), String> {
        let mut scanner = Scanner::new(text);
        scanner.skip_space();

        if scanner.skip("[") {
            self.parse_context(&mut scanner)?;
            scanner.skip_space();
            if !scanner.is_at_end() {
                return Err(format!("Unexpected '{}'", scanner.rest().trim()));
            }
            return Ok(());
        }

        let first_ident = scanner.read_ident().to_string();
        scanner.skip_space();

        if scanner.skip("=") {
            scanner.skip_space();
            return self.parse_assignment(&first_ident, scanner.rest().trim());
        }
        if scanner.skip(">>") {
            let rhs = scanner.rest().trim().to_string();
            if let Some(position) = self.find_command(&first_ident) {
                return self.add_command_mapping(position, &rhs);
            }
            return self.parse_command_and_mapping(&first_ident, &rhs);
        }

        // the left-hand side is a whole sequence expression
        let Some(position) = text.find(">>") else {
            return Err("Missing '>>'".into());
        };
        let lhs = text[..position].to_string();
        let rhs = text[position + 2..].trim().to_string();
        self.parse_command_and_mapping(&lhs, &rhs)
    }

    // --- assignments ------------------------------------------------------

    fn parse_assignment(&mut self, name: &str, rhs: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err("Identifier expected".into());
        }
        if self.parse_logical_key_definition(name, rhs)? {
            return Ok(());
        }
        if self.key_by_name(name).is_some() {
            return Err(format!("Invalid macro name '{}'", name));
        }
        let value = self.preprocess(rhs);
        self.macros.insert(name.to_string(), value);
        Ok(())
    }

    /// `Name = K1 | K2 | …` defines a logical key when the first token
    /// resolves to a key and is followed by `|`. Chained members register
    /// anonymous intermediate nodes so expansion flattens transitively.
    fn parse_logical_key_definition(&mut self, name: &str, rhs: &str) -> Result<bool, String> {
        if self.key_by_name(name).is_some() {
            return Ok(false);
        }
        // sticky classification: a macro name stays a macro
        if self.macros.contains_key(name) {
            return Ok(false);
        }

        let mut scanner = Scanner::new(rhs);
        let first = self.preprocess_ident(scanner.read_ident());
        let Some(mut left) = self.key_by_name(&first) else {
            return Ok(false);
        };
        scanner.skip_space();
        if !scanner.skip("|") {
            return Ok(false);
        }

        loop {
            scanner.skip_space();
            let token = self.preprocess_ident(scanner.read_ident());
            let right = self
                .key_by_name(&token)
                .ok_or_else(|| format!("Invalid key '{}'", token))?;
            scanner.skip_space();
            if scanner.skip("|") {
                left = self.add_logical_key("$", left, right);
                continue;
            }
            self.add_logical_key(name, left, right);
            scanner.skip_space();
            if !scanner.is_at_end() {
                return Err(format!("Unexpected '{}'", scanner.rest()));
            }
            return Ok(true);
        }
    }

    fn add_logical_key(&mut self, name: &str, left: Key, right: Key) -> Key {
        let both = Key(Key::FIRST_LOGICAL.0 + self.logical_keys.len() as u16);
        self.logical_keys.push(LogicalKey {
            name: name.to_string(),
            both,
            left,
            right,
        });
        both
    }

    // --- macro substitution ----------------------------------------------

    fn preprocess_ident(&self, ident: &str) -> String {
        self.macros
            .get(ident)
            .cloned()
            .unwrap_or_else(|| ident.to_string())
    }

    /// Substitute macro references in a fragment. Substitution is textual and
    /// happens before the fragment is parsed; macro bodies were substituted
    /// when they were defined, so one level suffices here.
    fn preprocess(&self, text: &str) -> String {
        let mut result = String::new();
        let mut scanner = Scanner::new(text.trim());
        while let Some(c) = scanner.peek() {
            if is_ident_char(c) {
                let ident = scanner.read_ident();
                result.push_str(&self.preprocess_ident(ident));
            } else {
                scanner.advance();
                result.push(c);
            }
        }
        result
    }

    // --- mappings ---------------------------------------------------------

    fn parse_command_and_mapping(&mut self, lhs: &str, rhs: &str) -> Result<(), String> {
        let input = self.parse_input(lhs)?;
        if let Some(command_name) = self.parse_command_name(rhs) {
            self.add_command(input, command_name);
            Ok(())
        } else {
            let output = self.parse_output(rhs)?;
            self.add_mapping(input, output);
            Ok(())
        }
    }

    /// A right-hand side names a command when it is a single identifier that
    /// is not a key (after macro substitution).
    fn parse_command_name(&self, text: &str) -> Option<String> {
        let mut scanner = Scanner::new(text);
        scanner.skip_space();
        let ident = self.preprocess_ident(scanner.read_ident());
        scanner.skip_space();
        if !scanner.is_at_end() || !is_ident(&ident) || self.key_by_name(&ident).is_some() {
            return None;
        }
        Some(ident)
    }

    fn parse_input(&mut self, text: &str) -> Result<KeySequence, String> {
        let text = self.preprocess(text);
        let mut sequence = parse_sequence(&text, true, self)?;
        if sequence.is_empty() {
            return Err("Missing input expression".into());
        }
        if !self.context_modifier.is_empty() {
            let mut full = self.context_modifier.clone();
            full.append(&mut sequence);
            for event in self.context_modifier.iter().rev() {
                if event.state == KeyState::Down {
                    full.push(KeyEvent::new(event.key, KeyState::UpAsync));
                }
            }
            sequence = full;
        }
        Ok(sequence)
    }

    fn parse_output(&mut self, text: &str) -> Result<KeySequence, String> {
        let text = self.preprocess(text);
        parse_sequence(&text, false, self)
    }

    fn find_command(&self, name: &str) -> Option<usize> {
        self.commands.iter().position(|command| command.name == name)
    }

    fn add_command(&mut self, input: KeySequence, name: String) {
        let index = match self.find_command(&name) {
            Some(position) => self.commands[position].index,
            None => {
                let index = -((self.commands.len() + 1) as i32);
                self.commands.push(Command {
                    name,
                    index,
                    mapped: false,
                });
                index
            }
        };
        self.config.contexts[self.current_context]
            .inputs
            .push(Input {
                input,
                output_index: index,
            });
    }

    fn add_mapping(&mut self, input: KeySequence, output: KeySequence) {
        let context = &mut self.config.contexts[self.current_context];
        context.inputs.push(Input {
            input,
            output_index: context.outputs.len() as i32,
        });
        context.outputs.push(output);
    }

    fn add_command_mapping(&mut self, position: usize, rhs: &str) -> Result<(), String> {
        let output = self.parse_output(rhs)?;
        let index = self.commands[position].index;
        let name = self.commands[position].name.clone();
        let context = &mut self.config.contexts[self.current_context];
        if context.command_outputs.iter().any(|c| c.index == index) {
            return Err(format!("Duplicate mapping of '{}'", name));
        }
        context.command_outputs.push(CommandOutput {
            name,
            index,
            output,
        });
        self.commands[position].mapped = true;
        Ok(())
    }

    // --- context headers --------------------------------------------------

    fn parse_context(&mut self, scanner: &mut Scanner) -> Result<(), String> {
        self.context_modifier.clear();
        scanner.skip_space();

        if scanner.skip("default") {
            scanner.skip_space();
            if !scanner.skip("]") {
                return Err("Missing ']'".into());
            }
            self.current_context = 0;
            return Ok(());
        }

        let mut context = Context::default();
        loop {
            let attrib = scanner.read_ident().to_string();
            if attrib.is_empty() {
                return Err("Identifier expected".into());
            }
            scanner.skip_space();
            if !scanner.skip("=") {
                return Err("Missing '='".into());
            }
            scanner.skip_space();
            match attrib.as_str() {
                "class" => {
                    context.window_class_filter = read_filter(scanner, FilterStyle::Exact)?;
                }
                "title" => {
                    context.window_title_filter = read_filter(scanner, FilterStyle::Substring)?;
                }
                "system" => {
                    if scanner.peek() == Some('/') {
                        return Err("String expected".into());
                    }
                    let value = read_plain_value(scanner)?;
                    if System::from_name(value).is_none() {
                        return Err(format!("Unknown system '{}'", value));
                    }
                    context.system_filter = Some(value.to_string());
                }
                "modifier" => {
                    let value = read_plain_value(scanner)?;
                    self.set_context_modifier(&mut context, value)?;
                }
                _ => return Err(format!("Unexpected '{}'", attrib)),
            }

            scanner.skip_space();
            if scanner.skip("]") {
                break;
            }
            if scanner.is_at_end() {
                return Err("Missing ']'".into());
            }
        }

        self.config.contexts.push(context);
        self.current_context = self.config.contexts.len() - 1;
        Ok(())
    }

    /// Lower the `modifier=` list. The release markers are dropped from the
    /// prefix; unprefixed keys get their release re-appended at each input's
    /// tail instead.
    fn set_context_modifier(&mut self, context: &mut Context, value: &str) -> Result<(), String> {
        let text = self.preprocess(value);
        let sequence = parse_sequence(&text, true, self)?;
        self.context_modifier = sequence
            .into_iter()
            .filter(|event| event.state != KeyState::UpAsync)
            .collect();
        context.modifier_filter = Some(value.to_string());
        Ok(())
    }

    // --- resolution -------------------------------------------------------

    fn finalize(mut self) -> Result<Config, ParseError> {
        // every command needs an output binding somewhere
        for command in &self.commands {
            if !command.mapped {
                return Err(ParseError::new(
                    format!("Command '{}' was not mapped", command.name),
                    self.line,
                ));
            }
        }

        filter_system_contexts(&mut self.config, self.system);

        // drop non-default contexts that collected nothing
        let mut index = 0;
        self.config.contexts.retain(|context| {
            let keep = index == 0 || !context.is_empty();
            index += 1;
            keep
        });

        expand_logical_keys(&mut self.config, &self.logical_keys);

        log::debug!(
            "parsed configuration: {} context(s), {} action(s)",
            self.config.contexts.len(),
            self.config.actions.len()
        );
        Ok(self.config)
    }
}

fn read_plain_value<'a>(scanner: &mut Scanner<'a>) -> Result<&'a str, String> {
    match scanner.peek() {
        Some(quote @ ('\'' | '"')) => {
            scanner.advance();
            scanner
                .read_quoted(quote)
                .ok_or_else(|| "Unterminated string".to_string())
        }
        _ => Ok(scanner.read_value(&[']'])),
    }
}

fn read_filter(scanner: &mut Scanner, style: FilterStyle) -> Result<Filter, String> {
    if scanner.skip("/") {
        let rest = scanner.rest();
        let mut escaped = false;
        let mut close = None;
        for (offset, c) in rest.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '/' => {
                    close = Some(offset);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = close else {
            return Err("Unterminated regular expression".into());
        };
        let pattern = rest[..end].to_string();
        scanner.skip(&rest[..end + 1]);
        let case_insensitive = scanner.skip("i");
        return Filter::regex(&format!("/{}/", pattern), &pattern, case_insensitive);
    }

    let value = read_plain_value(scanner)?;
    Ok(match style {
        FilterStyle::Exact => Filter::exact(value),
        FilterStyle::Substring => Filter::substring(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format_sequence;

    fn parse(text: &str) -> Config {
        Config::parse_with_system(text, System::Linux).unwrap()
    }

    #[test]
    fn test_simple_mapping() {
        let config = parse("A >> B");
        assert_eq!(config.contexts.len(), 1);
        assert_eq!(config.contexts[0].inputs.len(), 1);
        assert_eq!(config.contexts[0].inputs[0].output_index, 0);
        assert_eq!(
            format_sequence(&config.contexts[0].inputs[0].input),
            "+A ~A"
        );
        assert_eq!(format_sequence(&config.contexts[0].outputs[0]), "+B -B");
    }

    #[test]
    fn test_macro_substitution() {
        let config = parse("MyMacro = A B\nMyMacro >> C");
        assert_eq!(
            format_sequence(&config.contexts[0].inputs[0].input),
            "+A ~A +B ~B"
        );
        assert_eq!(format_sequence(&config.contexts[0].outputs[0]), "+C -C");
    }

    #[test]
    fn test_macro_referencing_earlier_macro() {
        let config = parse("M1 = F\nM2 = E M1 G\nM2 >> X");
        assert_eq!(
            format_sequence(&config.contexts[0].inputs[0].input),
            "+E ~E +F ~F +G ~G"
        );
    }

    #[test]
    fn test_macro_may_not_shadow_key_name() {
        assert!(Config::parse_with_system("Space = Enter", System::Linux).is_err());
        assert!(Config::parse_with_system("Shift = Enter", System::Linux).is_err());
    }

    #[test]
    fn test_empty_macro() {
        let config = parse("M =\nA M >> B");
        assert_eq!(
            format_sequence(&config.contexts[0].inputs[0].input),
            "+A ~A"
        );
    }

    #[test]
    fn test_logical_key_definition_and_sticky_classification() {
        // defined as a macro first, '|' later keeps it a macro
        let result = Config::parse_with_system("M = A\nM = B | C\nM{X} >> Y", System::Linux);
        assert!(result.is_err());

        // chained definition with a macro member
        let config = parse("Alt = AltLeft\nExt = IntlBackslash | Alt\nExt{A} >> ArrowLeft");
        assert_eq!(config.contexts[0].inputs.len(), 2);
    }

    #[test]
    fn test_logical_key_errors() {
        for text in [
            "Ext = A | ",
            "Ext = A | B |",
            "Ext = A | something",
            "A >> B | C",
            "A | B >> C",
        ] {
            assert!(Config::parse_with_system(text, System::Linux).is_err(), "{}", text);
        }
    }

    #[test]
    fn test_empty_output_suppresses_key() {
        let config = parse("A >>");
        assert_eq!(config.contexts[0].inputs.len(), 1);
        assert!(config.contexts[0].outputs[0].is_empty());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(Config::parse_with_system(">> B", System::Linux).is_err());
    }

    #[test]
    fn test_default_context_reselection() {
        let config = parse("[default]\nA >> B\n[class='x']\nC >> D\n[default]\nE >> F");
        assert_eq!(config.contexts.len(), 2);
        assert_eq!(config.contexts[0].inputs.len(), 2);
        assert_eq!(config.contexts[1].inputs.len(), 1);
    }

    #[test]
    fn test_unknown_system_is_rejected() {
        assert!(Config::parse_with_system("[system='BeOS']\nA >> B", System::Linux).is_err());
    }

    #[test]
    fn test_line_numbers_in_errors() {
        let error =
            Config::parse_with_system("A >> B\n\nC >> NoSuchKey D", System::Linux).unwrap_err();
        assert_eq!(error.line, 3);
        assert!(error.to_string().contains("in line 3"));
    }

    #[test]
    fn test_modifier_context() {
        let config = parse("Ext = Virtual1\n[modifier='Ext']\nD >> Y");
        assert_eq!(
            format_sequence(&config.contexts[1].inputs[0].input),
            "+Virtual1 +D ~D ~Virtual1"
        );
        assert_eq!(config.contexts[1].modifier_filter.as_deref(), Some("Ext"));
    }

    #[test]
    fn test_not_modifier_context() {
        let config = parse("[modifier='!Virtual1 Virtual2']\nE >> Z");
        assert_eq!(
            format_sequence(&config.contexts[1].inputs[0].input),
            "!Virtual1 +Virtual2 +E ~E ~Virtual2"
        );
    }
}
