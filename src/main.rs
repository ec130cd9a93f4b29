use clap::{Parser as ClapParser, Subcommand};
use bindexpr::{
    ParserOptions,
    cli::{self, CheckOptions, CliError},
};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "bindexpr")]
#[command(about = "bindexpr - parse and evaluate binding expressions against JSON")]
#[command(version)]
struct Cli {
    /// Log cache and compiler activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum expression length in characters
    #[arg(long, global = true, default_value_t = ParserOptions::DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Maximum bracket and tree nesting depth
    #[arg(long, global = true, default_value_t = ParserOptions::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression, list what it reads and evaluate it
    Check {
        /// The expression to check
        expression: String,

        /// JSON context (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON object of alias values, referenced as @name
        #[arg(short, long)]
        aliases: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Print the postfix token stream with arities
    Tokens {
        /// The expression to tokenize
        expression: String,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let parser = ParserOptions::default()
        .with_max_length(cli.max_length)
        .with_max_depth(cli.max_depth);

    let result = match cli.command {
        Commands::Check {
            expression,
            input,
            aliases,
            pretty,
            syntax_only,
        } => run_check(expression, input, aliases, pretty, syntax_only, parser),
        Commands::Tokens { expression } => {
            cli::render_tokens(&expression, &parser).map(|out| print!("{}", out))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(
    expression: String,
    input: Option<String>,
    aliases: Option<String>,
    pretty: bool,
    syntax_only: bool,
    parser: ParserOptions,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CheckOptions {
        expression,
        input,
        aliases,
        syntax_only,
        parser,
    };

    let report = cli::execute_check(&options)?.to_json();
    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }?;
    println!("{}", json);
    Ok(())
}
