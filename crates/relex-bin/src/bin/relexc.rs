use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use relex::lexeme_def::parse_token_defs;
use relex::{Dfa, Nfa};

/// Compile a token-set definition file into a binary scanner table.
#[derive(Parser)]
#[command(name = "relexc")]
struct Args {
    /// Token definition file, one `Name: pattern` rule per line.
    input: PathBuf,
    /// Output path for the serialized table.
    output: PathBuf,
    /// Print the lowered transition table and the compiled automaton.
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tokens");
    let defs = parse_token_defs(stem, &source);

    let nfa = Nfa::new(&defs.patterns(), &defs.terminal_ids())
        .context("building the automaton from token patterns")?;
    if args.dump {
        println!("{}", nfa);
    }
    let dfa = Dfa::from_nfa(&nfa).context("compiling the scanner table")?;
    if args.dump {
        println!("{}", dfa);
    }

    let bytes = dfa
        .to_table()
        .to_bytes()
        .map_err(|e| anyhow!("serializing the table: {}", e))?;
    fs::write(&args.output, &bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("wrote {}, {} bytes", args.output.display(), bytes.len());
    Ok(())
}
