use std::{
    error::Error,
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
    process,
};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use triangle::{codegen::interface, compiler::Compilation};

mod emit;

use emit::Emit;

/// Compiles a Triangle program into Triangle Abstract Machine code.
#[derive(Parser)]
#[command(name = "trianglec", version)]
struct Args {
    /// The source file.
    input: PathBuf,

    /// Stem of the output files, defaults to the input's.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Emit::Both)]
    emit: Emit,

    /// Prints every token before compiling.
    #[arg(long)]
    dump_tokens: bool,

    /// Prints the decorated syntax tree.
    #[arg(long)]
    dump_tree: bool,

    /// Logs each compilation stage.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(error) => {
            eprintln!("failed to run: {error}");
            process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether the program compiled.
fn run(args: &Args) -> Result<bool, Box<dyn Error>> {
    let src = fs::read_to_string(&args.input)?;
    info!("compiling {}", args.input.display());

    let compilation = Compilation::run_str(&src);

    if args.dump_tokens {
        for token in &compilation.tokens {
            println!("{token:?}");
        }
    }
    if args.dump_tree {
        if let Some(tree) = compilation.tree() {
            print!("{tree}");
        }
    }

    let code = match compilation.into_result() {
        Ok(code) => code,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}: {error:#}", args.input.display());
            }
            eprintln!("compilation failed with {} errors", errors.len());
            return Ok(false);
        }
    };

    let stem = args.output.as_deref().unwrap_or(&args.input);
    for &format in args.emit.formats() {
        let path = stem.with_extension(format.extension());
        let file = BufWriter::new(File::create(&path)?);
        interface::write(file, &code, format)?;
        debug!("wrote {format} code to {}", path.display());
    }
    info!("emitted {} instructions", code.len());
    Ok(true)
}
