use crate::codegen::{EmitError, Session};

use inkwell::targets::FileType;

use std::fs;
use std::path::Path;

fn validate_parent_exists(path: &Path) -> Result<(), EmitError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            Err(EmitError::MissingDirectory(parent.to_path_buf()))
        }
        _ => Ok(()),
    }
}

impl Session<'_> {
    /// The module as textual LLVM IR.
    pub fn ir_text(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Writes the verified module as textual IR.
    pub fn emit_ir(&self, path: &Path) -> Result<(), EmitError> {
        self.ensure_generated()?;
        validate_parent_exists(path)?;

        self.module
            .print_to_file(path)
            .map_err(|e| EmitError::Ir {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), "wrote IR");
        Ok(())
    }

    /// Compiles the verified module to a native object file.
    ///
    /// A failed write leaves no file behind.
    pub fn emit_object(&self, path: &Path) -> Result<(), EmitError> {
        let machine = self
            .target_machine
            .as_ref()
            .ok_or(EmitError::MissingTargetMachine)?;
        self.ensure_generated()?;
        validate_parent_exists(path)?;

        if let Err(e) = machine.write_to_file(&self.module, FileType::Object, path) {
            // a partial object may have been written
            let _ = fs::remove_file(path);
            return Err(EmitError::Object {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }

        tracing::debug!(path = %path.display(), "wrote object file");
        Ok(())
    }

    /// Compiles the verified module to object code in memory.
    pub fn emit_object_to_memory(&self) -> Result<Vec<u8>, EmitError> {
        let machine = self
            .target_machine
            .as_ref()
            .ok_or(EmitError::MissingTargetMachine)?;
        self.ensure_generated()?;

        let buffer = machine
            .write_to_memory_buffer(&self.module, FileType::Object)
            .map_err(|e| EmitError::Object {
                path: "<memory>".into(),
                message: e.to_string(),
            })?;

        Ok(buffer.as_slice().to_vec())
    }

    fn ensure_generated(&self) -> Result<(), EmitError> {
        if self.generated {
            Ok(())
        } else {
            Err(EmitError::NotGenerated)
        }
    }
}
