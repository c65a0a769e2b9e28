use crate::ast::{BinOp, Expr, ExprKind, UnOp};
use crate::codegen::{CodegenError, Session};

use inkwell::types::IntType;
use inkwell::values::IntValue;

impl<'ctx> Session<'ctx> {
    /// Lowers an expression tree in post-order at the builder's position.
    pub fn lower_expr(&self, expr: &Expr<'ctx>) -> Result<IntValue<'ctx>, CodegenError> {
        let ty = self.lower_int_type(&expr.ty)?;

        match &expr.kind {
            ExprKind::Literal(value) => Ok(ty.const_int(*value as u64, expr.ty.is_signed())),

            ExprKind::Unary { op, operand } => {
                let value = self.lower_operand(operand, ty)?;
                match op {
                    UnOp::Plus => Ok(value),
                    UnOp::Minus => Ok(self.builder.build_int_neg(value, "neg_tmp")?),
                }
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_operand(lhs, ty)?;
                let rhs = self.lower_operand(rhs, ty)?;
                let res = match op {
                    BinOp::Add => self.builder.build_int_add(lhs, rhs, "add_tmp")?,
                    BinOp::Sub => self.builder.build_int_sub(lhs, rhs, "sub_tmp")?,
                    BinOp::Mul => self.builder.build_int_mul(lhs, rhs, "mul_tmp")?,
                    // signedness comes from this node's descriptor, not the operands'
                    BinOp::Div if expr.ty.is_signed() => {
                        self.builder.build_int_signed_div(lhs, rhs, "div_tmp")?
                    }
                    BinOp::Div => self.builder.build_int_unsigned_div(lhs, rhs, "div_tmp")?,
                };
                Ok(res)
            }
        }
    }

    /// Lowers a child and widens or truncates it to the parent's integer type.
    fn lower_operand(
        &self,
        child: &Expr<'ctx>,
        parent: IntType<'ctx>,
    ) -> Result<IntValue<'ctx>, CodegenError> {
        let value = self.lower_expr(child)?;
        self.cast_int(value, parent, child.ty.is_signed(), "operand_cast")
    }
}
