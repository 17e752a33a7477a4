// Command-line interface for duomark
//
// This binary exposes the conversion engine that sits between a Markdown source
// editor and its structured twin: converting between formats, checking that a file
// survives the Markdown round trip, rendering the preview page and inspecting the
// intermediate stages.
//
// Usage:
//  duomark <input> --to <format> [--from <format>] [-o <file>]   - Convert between formats (default)
//  duomark convert <input> --to <format> ...                     - Same as above (explicit)
//  duomark roundtrip <input> [--check] [-o <file>]               - Rewrite as canonical Markdown
//  duomark preview <input> [-o <file>]                           - Standalone HTML preview page
//  duomark inspect <input> [<transform>]                         - Show an intermediate stage
//  duomark list-formats                                          - List formats and transforms
//
// Extra Parameters:
//
// Format-specific parameters can be passed using --extra-<parameter-name> <value>.
// The CLI layer strips the "extra-" prefix and passes the parameters to the format.
// Example:
//  duomark notes.md --to html --extra-standalone --extra-title "My notes"
//
// Logging goes to stderr. DUOMARK_LOG takes an env-filter directive; --verbose
// raises the level regardless of it.

mod transforms;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use duomark_config::{DuomarkConfig, Loader};
use duomark_core::formats::html::{serialize_to_html, HtmlOptions};
use duomark_core::formats::markdown::ListNumbering;
use duomark_core::{parse_markdown, serialize_to_markdown, FormatRegistry};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const SUBCOMMANDS: &[&str] = &[
    "convert",
    "roundtrip",
    "preview",
    "inspect",
    "list-formats",
    "help",
];

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
/// - `--extras-<key>` (alias for `--extra-<key>`)
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        let key = arg
            .strip_prefix("--extra-")
            .or_else(|| arg.strip_prefix("--extras-"));

        if let Some(key) = key {
            let value = args.get(i + 1).filter(|next| !next.starts_with('-'));
            match value {
                Some(value) => {
                    extra_params.insert(key.to_string(), value.clone());
                    i += 2;
                }
                None => {
                    extra_params.insert(key.to_string(), "true".to_string());
                    i += 1;
                }
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input file path")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .help("Output file path (defaults to stdout)")
        .value_hint(ValueHint::FilePath)
}

fn build_cli() -> Command {
    Command::new("duomark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert, normalize and inspect Markdown documents")
        .long_about(
            "duomark converts Markdown to and from the structured document model used by\n\
            dual-surface editors.\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to pass format-specific options.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            duomark notes.md --to html                    # HTML fragment on stdout\n  \
            duomark notes.md --to json -o notes.json      # Document tree as JSON\n  \
            duomark roundtrip notes.md --check            # Fail if not canonical\n  \
            duomark inspect notes.md events-simple        # Show the event stream",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a duomark.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (repeat for debug output)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .long_about(
                    "Convert documents between formats.\n\n\
                    Supported formats:\n  \
                    - markdown: Markdown (.md)\n  \
                    - html:     HTML preview export, HTML import (.html)\n  \
                    - json:     Document tree as JSON (.json)\n  \
                    - treeviz:  Tree visualization (output only)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.",
                )
                .arg(input_arg())
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Parse Markdown and write it back in canonical form")
                .long_about(
                    "Parse a Markdown file into the document tree and serialize it again.\n\n\
                    The output is what a structured editor would write after any edit.\n\
                    With --check nothing is written; the exit code tells whether the\n\
                    file is already canonical.",
                )
                .arg(input_arg())
                .arg(
                    Arg::new("check")
                        .long("check")
                        .help("Exit with an error if the file is not in canonical form")
                        .action(ArgAction::SetTrue),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("preview")
                .about("Render a Markdown file as a standalone HTML page")
                .arg(input_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect intermediate representations of a Markdown file")
                .arg(
                    Arg::new("path")
                        .help("Path to the Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("transform")
                        .help("Transform to apply (stage-format). Defaults to 'tree-treeviz'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            transforms::AVAILABLE_TRANSFORMS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(Command::new("list-formats").about("List conversion formats and inspect transforms"))
}

/// Parse the command line, injecting `convert` when the first argument is a file.
fn parse_command_line(cli: Command, args: &[String]) -> ArgMatches {
    match cli.clone().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) => {
            let injectable = args
                .get(1)
                .is_some_and(|first| !first.starts_with('-') && !SUBCOMMANDS.contains(&first.as_str()));
            if !injectable {
                err.exit();
            }
            let mut injected = vec![args[0].clone(), "convert".to_string()];
            injected.extend_from_slice(&args[1..]);
            cli.try_get_matches_from(&injected)
                .unwrap_or_else(|err| err.exit())
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("DUOMARK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);
    let matches = parse_command_line(build_cli(), &cleaned_args);

    init_logging(matches.get_count("verbose"));

    let mut config = load_cli_config(matches.get_one::<String>("config").map(String::as_str));
    let title_override = extra_params.get("title").cloned();
    apply_config_overrides(&mut config, &mut extra_params);

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            let input = required(sub_matches, "input");
            let to = required(sub_matches, "to");
            let registry = registry_from_config(&config);
            let from = match sub_matches.get_one::<String>("from") {
                Some(from) => from.clone(),
                None => registry.detect_format_from_filename(input).unwrap_or_else(|| {
                    eprintln!("Error: Could not detect format from filename '{input}'");
                    eprintln!("Please specify --from explicitly");
                    std::process::exit(1);
                }),
            };
            let output = sub_matches.get_one::<String>("output").map(String::as_str);
            handle_convert_command(&registry, input, &from, to, output, &extra_params, &config);
        }
        Some(("roundtrip", sub_matches)) => {
            let input = required(sub_matches, "input");
            let output = sub_matches.get_one::<String>("output").map(String::as_str);
            handle_roundtrip_command(input, sub_matches.get_flag("check"), output, &config);
        }
        Some(("preview", sub_matches)) => {
            let input = required(sub_matches, "input");
            let output = sub_matches.get_one::<String>("output").map(String::as_str);
            handle_preview_command(input, output, title_override, &config);
        }
        Some(("inspect", sub_matches)) => {
            let path = required(sub_matches, "path");
            let transform = sub_matches
                .get_one::<String>("transform")
                .map(String::as_str)
                .unwrap_or(transforms::DEFAULT_TRANSFORM);
            handle_inspect_command(path, transform, &extra_params, &config);
        }
        Some(("list-formats", _)) => handle_list_formats_command(&config),
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    match matches.get_one::<String>(name) {
        Some(value) => value,
        None => {
            eprintln!("Error: missing required argument '{name}'");
            std::process::exit(2);
        }
    }
}

fn read_input(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

fn write_output(output: Option<&str>, text: &str) {
    match output {
        Some(path) => {
            fs::write(path, text).unwrap_or_else(|e| {
                eprintln!("Error writing file '{path}': {e}");
                std::process::exit(1);
            });
            info!(path, bytes = text.len(), "wrote output");
        }
        None => print!("{text}"),
    }
}

fn registry_from_config(config: &DuomarkConfig) -> FormatRegistry {
    FormatRegistry::with_rules(config.markdown_rules(), config.html_conversion())
}

/// Handle the convert command
fn handle_convert_command(
    registry: &FormatRegistry,
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    extra_params: &HashMap<String, String>,
    config: &DuomarkConfig,
) {
    for format in [from, to] {
        if let Err(e) = registry.get(format) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    let source = read_input(input);
    debug!(from, to, bytes = source.len(), "converting");

    let mut format_options = format_params_from_config(config, to);
    for (key, value) in extra_params {
        format_options.insert(key.clone(), value.clone());
    }

    let result = registry
        .convert(&source, from, to, &format_options)
        .unwrap_or_else(|e| {
            eprintln!("Conversion error: {e}");
            std::process::exit(1);
        });
    write_output(output, &result);
}

/// Handle the roundtrip command
fn handle_roundtrip_command(input: &str, check: bool, output: Option<&str>, config: &DuomarkConfig) {
    let source = read_input(input);
    let canonical = serialize_to_markdown(&parse_markdown(&source), &config.markdown_rules());

    if check {
        if canonical != source {
            eprintln!("'{input}' is not in canonical form");
            std::process::exit(1);
        }
        return;
    }
    write_output(output, &canonical);
}

/// Handle the preview command
fn handle_preview_command(
    input: &str,
    output: Option<&str>,
    title_override: Option<String>,
    config: &DuomarkConfig,
) {
    let source = read_input(input);
    let title = title_override
        .or_else(|| {
            Path::new(input)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| config.convert.html.title.clone());
    let options = HtmlOptions {
        standalone: true,
        title: Some(title),
    };
    let html = serialize_to_html(&parse_markdown(&source), &config.markdown_rules(), &options);
    write_output(output, &html);
}

/// Handle the inspect command
fn handle_inspect_command(
    path: &str,
    transform: &str,
    extra_params: &HashMap<String, String>,
    config: &DuomarkConfig,
) {
    let source = read_input(path);
    let mut params = format_params_from_config(config, "treeviz");
    params.extend(format_params_from_config(config, "json"));
    for (key, value) in extra_params {
        params.insert(key.clone(), value.clone());
    }

    let output =
        transforms::execute_transform(&source, transform, &config.markdown_rules(), &params)
            .unwrap_or_else(|e| {
                eprintln!("Execution error: {e}");
                std::process::exit(1);
            });
    print!("{output}");
}

/// Handle the list-formats command
fn handle_list_formats_command(config: &DuomarkConfig) {
    let registry = registry_from_config(config);
    println!("Conversion formats:\n");
    for name in registry.list_formats() {
        let Ok(format) = registry.get(&name) else {
            continue;
        };
        let direction = match (format.supports_parsing(), format.supports_serialization()) {
            (true, true) => "in/out",
            (true, false) => "in",
            (false, true) => "out",
            (false, false) => "-",
        };
        println!(
            "  {name:<10} {direction:<7} .{:<16} {}",
            format.file_extensions().join(" ."),
            format.description()
        );
    }

    println!("\nInspect transforms:\n");
    for transform in transforms::AVAILABLE_TRANSFORMS {
        println!("  {transform}");
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> DuomarkConfig {
    let loader = Loader::new().with_project_file(".");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// Move `--extra-*` values that mirror configuration keys into the config.
fn apply_config_overrides(config: &mut DuomarkConfig, extra_params: &mut HashMap<String, String>) {
    if let Some(raw) = extra_params.remove("standalone") {
        config.convert.html.standalone = parse_bool_arg("standalone", &raw);
    }
    if let Some(title) = extra_params.remove("title") {
        config.convert.html.title = title;
    }
    if let Some(raw) = extra_params.remove("pretty") {
        config.convert.json.pretty = parse_bool_arg("pretty", &raw);
    }
    if let Some(raw) = extra_params.remove("inline") {
        config.inspect.treeviz.inline = parse_bool_arg("inline", &raw);
    }
    if let Some(raw) = take_override(extra_params, &["ordered-list-numbering", "numbering"]) {
        config.markdown.ordered_list_numbering =
            ListNumbering::from_name(&raw).unwrap_or_else(|| {
                eprintln!("Invalid ordered list numbering '{raw}' (sequential, repeat-one)");
                std::process::exit(1);
            });
    }
    if let Some(raw) = take_override(extra_params, &["bullet-marker", "bullet"]) {
        config.markdown.bullet_marker = match raw.as_str() {
            "-" => '-',
            "*" => '*',
            "+" => '+',
            other => {
                eprintln!("Invalid bullet marker '{other}' (-, * or +)");
                std::process::exit(1);
            }
        };
    }
}

/// Serialization parameters a format takes from the configuration.
fn format_params_from_config(config: &DuomarkConfig, format: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    match format {
        "html" => {
            params.insert(
                "standalone".to_string(),
                config.convert.html.standalone.to_string(),
            );
            params.insert("title".to_string(), config.convert.html.title.clone());
        }
        "json" => {
            params.insert("pretty".to_string(), config.convert.json.pretty.to_string());
        }
        "treeviz" => {
            params.insert("inline".to_string(), config.inspect.treeviz.inline.to_string());
        }
        _ => {}
    }
    params
}

fn take_override(map: &mut HashMap<String, String>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = map.remove(*key) {
            return Some(value);
        }
    }
    None
}

fn parse_bool_arg(flag: &str, raw: &str) -> bool {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        other => {
            eprintln!("Invalid boolean value '{other}' for --extra-{flag}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_extra_args_empty() {
        let input = args(&["duomark", "inspect", "notes.md"]);
        let (cleaned, extra) = parse_extra_args(&input);
        assert_eq!(cleaned, input);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_parse_extra_args_mixed_with_regular_args() {
        let (cleaned, extra) = parse_extra_args(&args(&[
            "duomark",
            "convert",
            "notes.md",
            "--to",
            "html",
            "--extra-title",
            "Notes",
            "--from",
            "markdown",
        ]));
        assert_eq!(
            cleaned,
            args(&["duomark", "convert", "notes.md", "--to", "html", "--from", "markdown"])
        );
        assert_eq!(extra.len(), 1);
        assert_eq!(extra.get("title"), Some(&"Notes".to_string()));
    }

    #[test]
    fn test_parse_extra_args_boolean_flags() {
        let (cleaned, extra) = parse_extra_args(&args(&[
            "duomark",
            "notes.md",
            "--extra-standalone",
            "--extras-bullet-marker",
            "*",
            "--extra-inline",
        ]));
        assert_eq!(cleaned, args(&["duomark", "notes.md"]));
        assert_eq!(extra.get("standalone"), Some(&"true".to_string()));
        assert_eq!(extra.get("bullet-marker"), Some(&"*".to_string()));
        assert_eq!(extra.get("inline"), Some(&"true".to_string()));
    }

    #[test]
    fn test_convert_is_injected_for_bare_paths() {
        let matches = parse_command_line(build_cli(), &args(&["duomark", "notes.md", "--to", "json"]));
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "convert");
        assert_eq!(sub.get_one::<String>("input").unwrap(), "notes.md");
    }

    #[test]
    fn apply_config_overrides_updates_known_flags() {
        let mut config = load_cli_config(None);
        let mut extras = HashMap::new();
        extras.insert("standalone".to_string(), "yes".to_string());
        extras.insert("numbering".to_string(), "repeat-one".to_string());
        extras.insert("bullet-marker".to_string(), "+".to_string());
        extras.insert("pretty".to_string(), "false".to_string());

        apply_config_overrides(&mut config, &mut extras);

        assert!(config.convert.html.standalone);
        assert!(!config.convert.json.pretty);
        let rules = config.markdown_rules();
        assert_eq!(rules.ordered_list_numbering, ListNumbering::RepeatOne);
        assert_eq!(rules.bullet(), '+');
        assert!(extras.is_empty());
    }

    #[test]
    fn format_params_follow_config() {
        let config = load_cli_config(None);
        let params = format_params_from_config(&config, "html");
        assert_eq!(params.get("standalone"), Some(&"false".to_string()));
        assert_eq!(params.get("title"), Some(&"Document".to_string()));
        assert!(format_params_from_config(&config, "markdown").is_empty());
    }
}
