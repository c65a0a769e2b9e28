use crate::lexer::TokenKind;

use inkwell::types::AnyTypeEnum;

use std::cell::Cell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;


#[derive(Debug)]
pub enum TypeKind<'ctx> {
    Void,
    Int { bits: u32, signed: bool },
    Float { bits: u32 },
    Pointer(Rc<Type<'ctx>>),
    Struct(Vec<Rc<Type<'ctx>>>),
    Array { element: Rc<Type<'ctx>>, count: u64 },
}

/// Storage shape of a value plus the LLVM type it lowers to.
///
/// The lowered type is cached on the descriptor itself, so two descriptors with
/// the same shape are lowered separately. Share one `Rc<Type>` to lower once.
#[derive(Debug)]
pub struct Type<'ctx> {
    pub kind: TypeKind<'ctx>,
    lowered: Cell<Option<AnyTypeEnum<'ctx>>>,
}

impl<'ctx> Type<'ctx> {
    pub fn new(kind: TypeKind<'ctx>) -> Rc<Self> {
        Rc::new(Type {
            kind,
            lowered: Cell::new(None),
        })
    }

    pub fn void() -> Rc<Self> {
        Self::new(TypeKind::Void)
    }

    pub fn int(bits: u32, signed: bool) -> Rc<Self> {
        Self::new(TypeKind::Int { bits, signed })
    }

    pub fn float(bits: u32) -> Rc<Self> {
        Self::new(TypeKind::Float { bits })
    }

    pub fn pointer(pointee: Rc<Type<'ctx>>) -> Rc<Self> {
        Self::new(TypeKind::Pointer(pointee))
    }

    pub fn structure(members: Vec<Rc<Type<'ctx>>>) -> Rc<Self> {
        Self::new(TypeKind::Struct(members))
    }

    pub fn array(element: Rc<Type<'ctx>>, count: u64) -> Rc<Self> {
        Self::new(TypeKind::Array { element, count })
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.kind, TypeKind::Int { signed: true, .. })
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, TypeKind::Int { .. })
    }

    pub fn cached(&self) -> Option<AnyTypeEnum<'ctx>> {
        self.lowered.get()
    }

    pub(crate) fn cache(&self, lowered: AnyTypeEnum<'ctx>) {
        self.lowered.set(Some(lowered));
    }

    /// Forgets the lowered type; the next lowering recomputes it.
    pub fn clear_cache(&self) {
        self.lowered.set(None);
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Void => write!(f, "void"),
            TypeKind::Int { bits, signed: true } => write!(f, "i{bits}"),
            TypeKind::Int { bits, signed: false } => write!(f, "u{bits}"),
            TypeKind::Float { bits } => write!(f, "f{bits}"),
            TypeKind::Pointer(pointee) => write!(f, "*{pointee}"),
            TypeKind::Struct(members) => {
                write!(f, "{{")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, "}}")
            }
            TypeKind::Array { element, count } => write!(f, "[{element}; {count}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Minus,
}

impl UnOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Minus => Some(UnOp::Minus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

#[derive(Debug)]
pub enum ExprKind<'ctx> {
    Literal(i64),
    Unary {
        op: UnOp,
        operand: Box<Expr<'ctx>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr<'ctx>>,
        rhs: Box<Expr<'ctx>>,
    },
}

/// A typed expression node. Children are owned exclusively by their parent.
#[derive(Debug)]
pub struct Expr<'ctx> {
    pub kind: ExprKind<'ctx>,
    pub ty: Rc<Type<'ctx>>,
    pub span: Range<usize>,
}

impl<'ctx> Expr<'ctx> {
    pub fn literal(value: i64, ty: Rc<Type<'ctx>>) -> Self {
        Expr {
            kind: ExprKind::Literal(value),
            ty,
            span: 0..0,
        }
    }

    pub fn unary(op: UnOp, operand: Expr<'ctx>, ty: Rc<Type<'ctx>>) -> Self {
        let span = operand.span.clone();
        Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        }
    }

    pub fn binary(op: BinOp, lhs: Expr<'ctx>, rhs: Expr<'ctx>, ty: Rc<Type<'ctx>>) -> Self {
        let span = lhs.span.start.min(rhs.span.start)..lhs.span.end.max(rhs.span.end);
        Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            span,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = span;
        self
    }

    pub fn depth(&self) -> usize {
        match &self.kind {
            ExprKind::Literal(_) => 1,
            ExprKind::Unary { operand, .. } => 1 + operand.depth(),
            ExprKind::Binary { lhs, rhs, .. } => 1 + lhs.depth().max(rhs.depth()),
        }
    }

    pub fn node_count(&self) -> usize {
        match &self.kind {
            ExprKind::Literal(_) => 1,
            ExprKind::Unary { operand, .. } => 1 + operand.node_count(),
            ExprKind::Binary { lhs, rhs, .. } => 1 + lhs.node_count() + rhs.node_count(),
        }
    }

    /// Constant-evaluates the tree in 64-bit arithmetic.
    ///
    /// Returns `None` on overflow or division by zero. Signedness of the
    /// descriptors is ignored; this is the value the tree denotes, not what
    /// the generated code computes after truncation.
    pub fn evaluate(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::Literal(value) => Some(*value),
            ExprKind::Unary { op: UnOp::Plus, operand } => operand.evaluate(),
            ExprKind::Unary { op: UnOp::Minus, operand } => operand.evaluate()?.checked_neg(),
            ExprKind::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (lhs.evaluate()?, rhs.evaluate()?);
                match op {
                    BinOp::Add => lhs.checked_add(rhs),
                    BinOp::Sub => lhs.checked_sub(rhs),
                    BinOp::Mul => lhs.checked_mul(rhs),
                    BinOp::Div => lhs.checked_div(rhs),
                }
            }
        }
    }
}

impl fmt::Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write!(f, "{value}"),
            ExprKind::Unary { op: UnOp::Minus, operand } => write!(f, "(neg {operand})"),
            ExprKind::Unary { op: UnOp::Plus, operand } => write!(f, "(pos {operand})"),
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({} {lhs} {rhs})", op.symbol()),
        }
    }
}
