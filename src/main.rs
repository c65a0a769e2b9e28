use pcc::codegen::TargetOptions;
use pcc::lexer::{SourceFile, TokenStream};
use pcc::parser::Parser;
use pcc::pipeline::{self, CompileError, CompileOptions, Outputs};

use anyhow::{Context, bail};
use ariadne::Source;
use clap::Parser as _;
use inkwell::OptimizationLevel;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

/// Compile an arithmetic expression into a native object file.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file holding one expression
    input: PathBuf,

    #[arg(short, long, default_value = "out.o")]
    output: PathBuf,

    /// Also write textual LLVM IR to this path
    #[arg(long, value_name = "PATH")]
    emit_ir: Option<PathBuf>,

    /// Target triple, defaults to the host
    #[arg(long)]
    triple: Option<String>,

    #[arg(long, default_value = "generic")]
    cpu: String,

    /// LLVM target features, e.g. "+avx2,-sse4.1"
    #[arg(long, default_value = "")]
    features: String,

    #[arg(short = 'O', default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    opt_level: u8,

    /// Print the parsed tree before compiling
    #[arg(long)]
    print_ast: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let contents = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file {}", cli.input.display()))?;
    let file = SourceFile::new(cli.input.display().to_string(), contents);

    if cli.print_ast {
        let tokens = TokenStream::lex(Rc::clone(&file));
        match Parser::new(&tokens).parse_program() {
            Ok(Some(ast)) => println!("{ast}"),
            Ok(None) => println!("<empty>"),
            // reported below by the pipeline
            Err(_) => {}
        }
    }

    let mut target = TargetOptions::host()
        .with_cpu(&cli.cpu)
        .with_features(&cli.features)
        .with_opt_level(opt_level(cli.opt_level));
    if let Some(triple) = &cli.triple {
        target = target.with_triple(triple);
    }

    let module_name = cli
        .input
        .file_stem()
        .map_or_else(|| "main".to_string(), |stem| stem.to_string_lossy().to_string());
    let options = CompileOptions {
        module_name,
        target,
    };
    let outputs = Outputs {
        ir: cli.emit_ir.clone(),
        object: cli.output.clone(),
    };

    match pipeline::compile(Rc::clone(&file), &options, &outputs) {
        Ok(()) => {
            println!(
                "{} {}",
                "wrote".green().bold(),
                outputs.object.display()
            );
            Ok(())
        }
        Err(CompileError::Parse(err)) => {
            err.report(&file)
                .eprint((file.name.clone(), Source::from(file.src.clone())))?;
            bail!("{} stage failed", CompileError::Parse(err).stage())
        }
        Err(err) => bail!("{} stage failed: {err}", err.stage()),
    }
}

fn opt_level(level: u8) -> OptimizationLevel {
    match level {
        0 => OptimizationLevel::None,
        1 => OptimizationLevel::Less,
        2 => OptimizationLevel::Default,
        _ => OptimizationLevel::Aggressive,
    }
}
