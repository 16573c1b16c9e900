// Rekey CLI
// Parses and inspects remapper configurations

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rekey_core::{format_sequence, Config, Context, System};

/// Keyboard remapper configuration tool
#[derive(Parser, Debug)]
#[command(name = "rekey")]
#[command(version)]
#[command(about = "Validate and inspect rekey configurations", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Print the expanded rule catalog
    #[arg(short, long)]
    dump: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let text = match fs::read_to_string(&args.config) {
        Ok(text) => text,
        Err(error) => {
            eprintln!("rekey: cannot read {}: {}", args.config.display(), error);
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::parse(&text) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("rekey: {}: {}", args.config.display(), error);
            return ExitCode::FAILURE;
        }
    };

    log::debug!("host system: {:?}", System::current());
    println!(
        "Configuration is valid: {} context(s), {} action(s)",
        config.contexts.len(),
        config.actions.len()
    );

    if args.dump {
        dump_catalog(&config);
    }
    ExitCode::SUCCESS
}

fn dump_catalog(config: &Config) {
    for (index, context) in config.contexts.iter().enumerate() {
        println!();
        println!("[context {}]{}", index, describe_context(context));
        for input in &context.inputs {
            let output = if input.output_index >= 0 {
                format_sequence(&context.outputs[input.output_index as usize])
            } else {
                let command = context
                    .command_outputs
                    .iter()
                    .find(|c| c.index == input.output_index)
                    .map(|c| c.name.as_str());
                match command {
                    Some(name) => format!("<command {}>", name),
                    None => "<command>".to_string(),
                }
            };
            println!("  {}  >>  {}", format_sequence(&input.input), output);
        }
        for command in &context.command_outputs {
            println!("  {}  >>  {}", command.name, format_sequence(&command.output));
        }
    }
    for (index, action) in config.actions.iter().enumerate() {
        println!("  Action{} = $({})", index, action.terminal_command);
    }
}

fn describe_context(context: &Context) -> String {
    let mut parts = Vec::new();
    if let Some(system) = &context.system_filter {
        parts.push(format!("system={}", system));
    }
    if !context.window_class_filter.string.is_empty() {
        parts.push(format!("class={}", context.window_class_filter.string));
    }
    if !context.window_title_filter.string.is_empty() {
        parts.push(format!("title={}", context.window_title_filter.string));
    }
    if let Some(modifier) = &context.modifier_filter {
        parts.push(format!("modifier=\"{}\"", modifier));
    }
    if parts.is_empty() {
        " default".to_string()
    } else {
        format!(" {}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["rekey", "keymap.conf"]);
        assert_eq!(args.config, PathBuf::from("keymap.conf"));
        assert!(!args.dump);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from(["rekey", "--dump", "--verbose", "keymap.conf"]);
        assert!(args.dump);
        assert!(args.verbose);
    }

    #[test]
    fn test_describe_context_default() {
        assert_eq!(describe_context(&Context::default()), " default");
    }

    #[test]
    fn test_dump_resolves_command_names() {
        let config = Config::parse_with_system(
            "A >> action\naction >> $(true)",
            System::Linux,
        )
        .unwrap();
        // smoke test: must not panic on command-bound inputs
        dump_catalog(&config);
    }
}
