use inkwell::builder::{Builder, BuilderError};
use inkwell::context::Context;
use inkwell::module::Module as LLVMModule;
use inkwell::targets::TargetMachine;
use thiserror::Error;

use std::path::PathBuf;

pub mod emit;
pub mod function;
pub mod instruction;
pub mod target;
pub mod types;


pub use target::{TargetError, TargetOptions};

/// Name of the implicit function wrapping the whole expression.
pub const ENTRY_FUNCTION: &str = "main";

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("this session already generated its entry function")]
    AlreadyGenerated,

    #[error("type {ty} cannot be lowered: {reason}")]
    UnsupportedType { ty: String, reason: &'static str },

    #[error("expression of type {ty} is not an integer")]
    NonIntegerExpression { ty: String },

    #[error("instruction construction failed: {0}")]
    Builder(#[from] BuilderError),

    #[error("module verification failed: {0}")]
    Verification(String),
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("no target machine, the session was created without a target")]
    MissingTargetMachine,

    #[error("nothing to emit, the module has not been generated and verified")]
    NotGenerated,

    #[error("output directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to write IR to '{}': {message}", .path.display())]
    Ir { path: PathBuf, message: String },

    #[error("failed to write object file '{}': {message}", .path.display())]
    Object { path: PathBuf, message: String },
}

/// Generation state for one compilation unit.
///
/// The LLVM context is borrowed and must outlive the session. `generate` runs
/// at most once per session; call [`Session::dispose`] when done.
pub struct Session<'ctx> {
    context: &'ctx Context,
    module: LLVMModule<'ctx>,
    builder: Builder<'ctx>,
    target_machine: Option<TargetMachine>,
    generated: bool,
}

impl<'ctx> Session<'ctx> {
    /// Opens a session whose module is configured for `target`.
    pub fn new(
        context: &'ctx Context,
        module_name: &str,
        target: &TargetOptions,
    ) -> Result<Self, TargetError> {
        let (machine, triple) = target.create_machine()?;
        let session = Self::without_target(context, module_name);

        session.module.set_triple(&triple);
        session
            .module
            .set_data_layout(&machine.get_target_data().get_data_layout());

        tracing::debug!(
            triple = %triple.as_str().to_string_lossy(),
            cpu = target.cpu(),
            "created target machine"
        );

        Ok(Session {
            target_machine: Some(machine),
            ..session
        })
    }

    /// Opens a session that can generate and print IR but not emit objects.
    pub fn without_target(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();

        Session {
            context,
            module,
            builder,
            target_machine: None,
            generated: false,
        }
    }

    pub fn context(&self) -> &'ctx Context {
        self.context
    }

    pub fn module(&self) -> &LLVMModule<'ctx> {
        &self.module
    }

    pub fn has_target_machine(&self) -> bool {
        self.target_machine.is_some()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Releases the builder, the module and the target machine, in that order.
    pub fn dispose(self) {
        let Session {
            builder,
            module,
            target_machine,
            ..
        } = self;

        drop(builder);
        drop(module);
        drop(target_machine);

        tracing::debug!("session disposed");
    }
}
