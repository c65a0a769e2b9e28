use crate::ast::Expr;
use crate::codegen::{CodegenError, ENTRY_FUNCTION, Session};

use inkwell::values::IntValue;

impl<'ctx> Session<'ctx> {
    /// Wraps `root` in `i32 main()` and verifies the module.
    ///
    /// With no root the function returns zero. A session generates once; after
    /// an error it should be disposed rather than reused.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %self.module.get_name().to_string_lossy()))]
    pub fn generate(&mut self, root: Option<&Expr<'ctx>>) -> Result<(), CodegenError> {
        if self.generated || self.module.get_function(ENTRY_FUNCTION).is_some() {
            return Err(CodegenError::AlreadyGenerated);
        }

        let i32_type = self.context.i32_type();
        let function = self
            .module
            .add_function(ENTRY_FUNCTION, i32_type.fn_type(&[], false), None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let ret_val = match root {
            Some(expr) => {
                let value = self.lower_expr(expr)?;
                self.cast_int(value, i32_type, expr.ty.is_signed(), "ret_cast")?
            }
            None => {
                tracing::debug!("no expression to lower, returning zero");
                i32_type.const_zero()
            }
        };
        self.builder.build_return(Some(&ret_val))?;

        self.module
            .verify()
            .map_err(|e| CodegenError::Verification(e.to_string()))?;
        tracing::debug!("module verified");

        self.generated = true;
        Ok(())
    }

    pub(crate) fn cast_int(
        &self,
        value: IntValue<'ctx>,
        target: inkwell::types::IntType<'ctx>,
        signed: bool,
        name: &str,
    ) -> Result<IntValue<'ctx>, CodegenError> {
        if value.get_type() == target {
            return Ok(value);
        }
        Ok(self
            .builder
            .build_int_cast_sign_flag(value, target, signed, name)?)
    }
}
