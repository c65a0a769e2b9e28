use crate::ast::Expr;
use crate::codegen::{CodegenError, EmitError, Session, TargetError, TargetOptions};
use crate::lexer::{SourceFile, TokenStream};
use crate::parser::{ParseError, Parser};

use inkwell::context::Context;
use thiserror::Error;

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;


#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub module_name: String,
    pub target: TargetOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: "main".to_string(),
            target: TargetOptions::host(),
        }
    }
}

/// Where the pipeline writes its artifacts.
#[derive(Debug, Clone)]
pub struct Outputs {
    pub ir: Option<PathBuf>,
    pub object: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Target,
    Codegen,
    Verify,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Target => "target",
            Stage::Codegen => "codegen",
            Stage::Verify => "verify",
            Stage::Emit => "emit",
        })
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl CompileError {
    /// The stage that failed. The lexer never fails on its own; an unknown
    /// character surfaces when the parser reaches it.
    pub fn stage(&self) -> Stage {
        match self {
            CompileError::Parse(ParseError::UnknownCharacter { .. }) => Stage::Lex,
            CompileError::Parse(_) => Stage::Parse,
            CompileError::Target(_) => Stage::Target,
            CompileError::Codegen(CodegenError::Verification(_)) => Stage::Verify,
            CompileError::Codegen(_) => Stage::Codegen,
            CompileError::Emit(_) => Stage::Emit,
        }
    }
}

/// Lexes, parses, lowers and emits one source file.
///
/// The object file is only written once every earlier stage succeeded.
#[tracing::instrument(level = "info", skip_all, fields(file = %file.name))]
pub fn compile(
    file: Rc<SourceFile>,
    options: &CompileOptions,
    outputs: &Outputs,
) -> Result<(), CompileError> {
    let context = Context::create();
    let tokens = TokenStream::lex(file);
    let ast = Parser::new(&tokens).parse_program()?;

    let mut session = Session::new(&context, &options.module_name, &options.target)?;
    let result = generate_and_emit(&mut session, ast.as_ref(), outputs);

    drop(ast);
    session.dispose();

    if let Err(err) = &result {
        tracing::error!(stage = %err.stage(), "compilation failed");
    }
    result
}

/// Runs the pipeline up to verification and returns the module as IR text.
pub fn compile_to_ir(file: Rc<SourceFile>, module_name: &str) -> Result<String, CompileError> {
    let context = Context::create();
    let tokens = TokenStream::lex(file);
    let ast = Parser::new(&tokens).parse_program()?;

    let mut session = Session::without_target(&context, module_name);
    let result = session.generate(ast.as_ref()).map(|()| session.ir_text());

    drop(ast);
    session.dispose();
    Ok(result?)
}

fn generate_and_emit<'ctx>(
    session: &mut Session<'ctx>,
    root: Option<&Expr<'ctx>>,
    outputs: &Outputs,
) -> Result<(), CompileError> {
    session.generate(root)?;
    if let Some(ir) = &outputs.ir {
        session.emit_ir(ir)?;
    }
    session.emit_object(&outputs.object)?;
    Ok(())
}
