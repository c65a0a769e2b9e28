use crate::ast::{Type, TypeKind};
use crate::codegen::{CodegenError, Session};

use inkwell::AddressSpace;
use inkwell::types::{AnyType, AnyTypeEnum, BasicType, BasicTypeEnum, IntType};

impl<'ctx> Session<'ctx> {
    /// Lowers a descriptor to its LLVM type, memoized on the descriptor.
    ///
    /// Aggregates lower their members first; members whose cache slot is
    /// already filled are not lowered again.
    pub fn lower_type(&self, ty: &Type<'ctx>) -> Result<AnyTypeEnum<'ctx>, CodegenError> {
        if let Some(lowered) = ty.cached() {
            return Ok(lowered);
        }

        let lowered = match &ty.kind {
            TypeKind::Void => self.context.void_type().as_any_type_enum(),
            TypeKind::Int { bits, .. } => self.int_type(*bits, ty)?.as_any_type_enum(),
            TypeKind::Float { bits } => {
                let float = match bits {
                    16 => self.context.f16_type(),
                    32 => self.context.f32_type(),
                    64 => self.context.f64_type(),
                    128 => self.context.f128_type(),
                    _ => return Err(unsupported(ty, "float width must be 16, 32, 64 or 128")),
                };
                float.as_any_type_enum()
            }
            TypeKind::Pointer(pointee) => {
                // pointers are opaque, the pointee is still lowered so its cache is warm
                self.lower_type(pointee)?;
                self.context
                    .ptr_type(AddressSpace::default())
                    .as_any_type_enum()
            }
            TypeKind::Struct(members) => {
                let fields = members
                    .iter()
                    .map(|member| self.lower_basic_type(member))
                    .collect::<Result<Vec<_>, _>>()?;
                self.context.struct_type(&fields, false).as_any_type_enum()
            }
            TypeKind::Array { element, count } => {
                let element = self.lower_basic_type(element)?;
                let count = u32::try_from(*count)
                    .map_err(|_| unsupported(ty, "array length does not fit in 32 bits"))?;
                element.array_type(count).as_any_type_enum()
            }
        };

        ty.cache(lowered);
        Ok(lowered)
    }

    /// Lowers a descriptor that must be an integer.
    pub fn lower_int_type(&self, ty: &Type<'ctx>) -> Result<IntType<'ctx>, CodegenError> {
        match self.lower_type(ty)? {
            AnyTypeEnum::IntType(int) => Ok(int),
            _ => Err(CodegenError::NonIntegerExpression { ty: ty.to_string() }),
        }
    }

    fn lower_basic_type(&self, ty: &Type<'ctx>) -> Result<BasicTypeEnum<'ctx>, CodegenError> {
        let lowered = self.lower_type(ty)?;
        as_basic(lowered).ok_or_else(|| unsupported(ty, "aggregate members must be value types"))
    }

    fn int_type(&self, bits: u32, ty: &Type<'ctx>) -> Result<IntType<'ctx>, CodegenError> {
        let int = match bits {
            1 => self.context.bool_type(),
            8 => self.context.i8_type(),
            16 => self.context.i16_type(),
            32 => self.context.i32_type(),
            64 => self.context.i64_type(),
            128 => self.context.i128_type(),
            _ => return Err(unsupported(ty, "integer width must be 1, 8, 16, 32, 64 or 128")),
        };
        Ok(int)
    }
}

fn as_basic(ty: AnyTypeEnum<'_>) -> Option<BasicTypeEnum<'_>> {
    match ty {
        AnyTypeEnum::ArrayType(t) => Some(t.into()),
        AnyTypeEnum::FloatType(t) => Some(t.into()),
        AnyTypeEnum::IntType(t) => Some(t.into()),
        AnyTypeEnum::PointerType(t) => Some(t.into()),
        AnyTypeEnum::StructType(t) => Some(t.into()),
        AnyTypeEnum::VectorType(t) => Some(t.into()),
        _ => None,
    }
}

fn unsupported(ty: &Type<'_>, reason: &'static str) -> CodegenError {
    CodegenError::UnsupportedType {
        ty: ty.to_string(),
        reason,
    }
}
