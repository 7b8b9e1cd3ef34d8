//! Declaration modifiers.

use shade_types::{ConversionCost, ScalarType};

use crate::{ExprId, Name};

/// Which compiler-known ("magic") declaration this is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MagicKind {
    Vector,
    Matrix,
}

/// One entry in a declaration's modifier list.
///
/// The parser attaches unchecked attributes; the final modifier-checking
/// pass may replace an entry with a typed form (see `NumThreads`).
#[derive(Clone, Debug)]
pub enum Modifier {
    /// Tags a core-module declaration as one of the basic types.
    BuiltinScalar(ScalarType),
    /// Tags a core-module declaration the compiler must find by name.
    Magic(MagicKind),
    /// The callee is an intrinsic operator; calls to it can constant-fold.
    IntrinsicOp,
    /// A constructor usable for implicit conversion, with its cost.
    ImplicitConversion(ConversionCost),
    /// Operator declaration callable in prefix position.
    Prefix,
    /// Operator declaration callable in postfix position.
    Postfix,
    Static,
    Const,
    /// GLSL `layout(constant_id = n)`: a specialization constant.
    ConstantId(u32),
    /// `__exported` on an import: re-export the module to importers.
    Exported,
    /// An attribute as parsed, pending verification.
    UncheckedAttribute { name: Name, args: Vec<ExprId> },
    /// The checked form of `[numthreads(x, y, z)]`.
    NumThreads { x: i64, y: i64, z: i64 },
}

impl Modifier {
    pub fn implicit_conversion_cost(&self) -> Option<ConversionCost> {
        match self {
            Modifier::ImplicitConversion(cost) => Some(*cost),
            _ => None,
        }
    }
}
