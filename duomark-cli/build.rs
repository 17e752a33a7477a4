use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the transforms from src/transforms.rs
// Build scripts can't access src/ modules
const AVAILABLE_TRANSFORMS: &[&str] = &[
    "events-simple",
    "events-json",
    "tree-treeviz",
    "tree-json",
    "markdown-canonical",
];

const FORMATS: &[&str] = &["markdown", "html", "json", "treeviz"];

fn input() -> Arg {
    Arg::new("input")
        .help("Input file path")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("duomark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert, normalize and inspect Markdown documents")
        .arg(
            Arg::new("config")
                .long("config")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .arg(input())
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_parser(clap::builder::PossibleValuesParser::new(FORMATS)),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .required(true)
                        .value_parser(clap::builder::PossibleValuesParser::new(FORMATS)),
                )
                .arg(output()),
        )
        .subcommand(
            Command::new("roundtrip")
                .arg(input())
                .arg(Arg::new("check").long("check").action(ArgAction::SetTrue))
                .arg(output()),
        )
        .subcommand(Command::new("preview").arg(input()).arg(output()))
        .subcommand(
            Command::new("inspect").arg(input()).arg(
                Arg::new("transform")
                    .index(2)
                    .value_parser(clap::builder::PossibleValuesParser::new(
                        AVAILABLE_TRANSFORMS,
                    )),
            ),
        )
        .subcommand(Command::new("list-formats"));

    generate_to(Bash, &mut cmd, "duomark", &outdir)?;
    generate_to(Zsh, &mut cmd, "duomark", &outdir)?;
    generate_to(Fish, &mut cmd, "duomark", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
