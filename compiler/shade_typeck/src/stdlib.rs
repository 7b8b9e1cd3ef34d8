//! The core module.
//!
//! Builds the standard-library declarations the checker relies on: the
//! builtin scalar types with their conversion constructors, the magic
//! `vector` and `matrix` generics, the unified-language typedefs, and the
//! intrinsic operators. The result is an ordinary module AST; checking it
//! (during [`crate::Session::bootstrap`]) registers the tagged
//! declarations with the session exactly as it would for any module.

use shade_ast::{
    AstArena, CtorData, Decl, DeclKind, Expr, ExprKind, FuncData, GenericData,
    GenericTypeParamData, MagicKind, Members, Modifier, ModuleData, ParamData, Scope, ScopeId,
    Span, StringInterner, TypeDefData, TypeExpr, VarData,
};
use shade_types::{ConversionCost, DeclId, IntVal, ParamDirection, ScalarType, Type};

/// Map the HLSL spellings of the vector/matrix types onto the unified
/// ones. Identity on names that are already unified.
pub fn translate_hlsl_type_names(name: &str) -> &str {
    match name {
        "float2" | "half2" => "vec2",
        "float3" | "half3" => "vec3",
        "float4" | "half4" => "vec4",
        "half" => "float",
        "int2" => "ivec2",
        "int3" => "ivec3",
        "int4" => "ivec4",
        "uint2" => "uvec2",
        "uint3" => "uvec3",
        "uint4" => "uvec4",
        "float3x3" | "half3x3" => "mat3",
        "float4x4" | "half4x4" => "mat4",
        other => other,
    }
}

const SCALARS: &[ScalarType] = &[
    ScalarType::Void,
    ScalarType::Bool,
    ScalarType::Int,
    ScalarType::UInt,
    ScalarType::Half,
    ScalarType::Float,
    ScalarType::Double,
];

/// Cost of the implicit scalar conversion `from -> to`. Promotions to a
/// higher rank are cheap; conversions that can lose information are not.
/// The small rank delta keeps "nearest" conversions preferred.
fn scalar_conversion_cost(from: ScalarType, to: ScalarType) -> ConversionCost {
    if to.rank() > from.rank() {
        ConversionCost(ConversionCost::RANK_PROMOTION.0 + u32::from(to.rank() - from.rank()))
    } else {
        ConversionCost(ConversionCost::GENERAL.0 + u32::from(from.rank() - to.rank()))
    }
}

/// Build the core module AST and its scope.
pub(crate) fn build_core_module(
    arena: &mut AstArena,
    interner: &StringInterner,
) -> (DeclId, ScopeId) {
    let module_name = interner.intern("core");
    let module = arena.alloc_decl(Decl::new(module_name, DeclKind::Module(ModuleData::default())));
    let scope = arena.alloc_scope(Scope::new(Some(module), None));
    if let DeclKind::Module(data) = &mut arena.decl_mut(module).kind {
        data.scope = Some(scope);
    }

    add_scalar_types(arena, interner, module);
    add_vector_generic(arena, interner, module);
    add_matrix_generic(arena, interner, module);
    add_builtin_typedefs(arena, interner, module);
    add_intrinsic_operators(arena, interner, module);

    (module, scope)
}

/// One struct declaration per scalar type, tagged builtin, holding the
/// implicit conversion constructors from every other non-void scalar.
fn add_scalar_types(arena: &mut AstArena, interner: &StringInterner, module: DeclId) {
    for &scalar in SCALARS {
        let decl = Decl::new(
            interner.intern(scalar.name()),
            DeclKind::Struct(Default::default()),
        )
        .with_modifier(Modifier::BuiltinScalar(scalar));
        let decl = arena.alloc_decl(decl);
        arena.add_member(module, decl);

        if scalar == ScalarType::Void {
            continue;
        }
        for &from in SCALARS {
            if from == scalar || from == ScalarType::Void {
                continue;
            }
            let ctor = make_ctor(
                arena,
                interner,
                &[("value", Type::Scalar(from))],
                Some(Modifier::ImplicitConversion(scalar_conversion_cost(from, scalar))),
            );
            arena.add_member(decl, ctor);
        }
    }
}

fn make_ctor(
    arena: &mut AstArena,
    interner: &StringInterner,
    params: &[(&str, Type)],
    modifier: Option<Modifier>,
) -> DeclId {
    let mut decl = Decl::new(interner.intern("__init"), DeclKind::Constructor(CtorData::default()));
    if let Some(m) = modifier {
        decl.modifiers.push(m);
    }
    let ctor = arena.alloc_decl(decl);
    for (name, ty) in params {
        let param = make_param(arena, interner, name, ty.clone());
        arena.add_member(ctor, param);
    }
    ctor
}

fn make_param(
    arena: &mut AstArena,
    interner: &StringInterner,
    name: &str,
    ty: Type,
) -> DeclId {
    arena.alloc_decl(Decl::new(
        interner.intern(name),
        DeclKind::Param(ParamData {
            var: VarData { ty: TypeExpr::resolved(ty), init: None },
            direction: ParamDirection::In,
        }),
    ))
}

/// `vector<T = float, int N = 4>`, with the inner struct tagged magic so
/// references to it lower to the dedicated vector type.
fn add_vector_generic(arena: &mut AstArena, interner: &StringInterner, module: DeclId) {
    let name = interner.intern("vector");

    let inner = arena.alloc_decl(
        Decl::new(name, DeclKind::Struct(Default::default()))
            .with_modifier(Modifier::Magic(MagicKind::Vector)),
    );

    let t_param = arena.alloc_decl(Decl::new(
        interner.intern("T"),
        DeclKind::GenericTypeParam(GenericTypeParamData {
            default: TypeExpr::resolved(Type::float()),
        }),
    ));
    let n_param = make_value_param(arena, interner, "N", 4);

    let generic = arena.alloc_decl(Decl::new(
        name,
        DeclKind::Generic(GenericData { members: Members::new(), inner }),
    ));
    arena.add_member(generic, t_param);
    arena.add_member(generic, n_param);
    arena.decl_mut(inner).parent = Some(generic);
    arena.add_member(module, generic);
}

/// `matrix<T = float, int R = 4, int C = 4>`.
fn add_matrix_generic(arena: &mut AstArena, interner: &StringInterner, module: DeclId) {
    let name = interner.intern("matrix");

    let inner = arena.alloc_decl(
        Decl::new(name, DeclKind::Struct(Default::default()))
            .with_modifier(Modifier::Magic(MagicKind::Matrix)),
    );

    let t_param = arena.alloc_decl(Decl::new(
        interner.intern("T"),
        DeclKind::GenericTypeParam(GenericTypeParamData {
            default: TypeExpr::resolved(Type::float()),
        }),
    ));
    let r_param = make_value_param(arena, interner, "R", 4);
    let c_param = make_value_param(arena, interner, "C", 4);

    let generic = arena.alloc_decl(Decl::new(
        name,
        DeclKind::Generic(GenericData { members: Members::new(), inner }),
    ));
    arena.add_member(generic, t_param);
    arena.add_member(generic, r_param);
    arena.add_member(generic, c_param);
    arena.decl_mut(inner).parent = Some(generic);
    arena.add_member(module, generic);
}

fn make_value_param(
    arena: &mut AstArena,
    interner: &StringInterner,
    name: &str,
    default: i64,
) -> DeclId {
    let init = arena.alloc_expr(Expr::new(ExprKind::IntLit(default), Span::DUMMY));
    arena.alloc_decl(Decl::new(
        interner.intern(name),
        DeclKind::GenericValueParam(VarData {
            ty: TypeExpr::resolved(Type::int()),
            init: Some(init),
        }),
    ))
}

/// The unified-language names: `vec2`..`vec4`, `ivec*`, `uvec*`, `mat3`,
/// `mat4`.
fn add_builtin_typedefs(arena: &mut AstArena, interner: &StringInterner, module: DeclId) {
    let vectors: &[(&str, ScalarType, i64)] = &[
        ("vec2", ScalarType::Float, 2),
        ("vec3", ScalarType::Float, 3),
        ("vec4", ScalarType::Float, 4),
        ("ivec2", ScalarType::Int, 2),
        ("ivec3", ScalarType::Int, 3),
        ("ivec4", ScalarType::Int, 4),
        ("uvec2", ScalarType::UInt, 2),
        ("uvec3", ScalarType::UInt, 3),
        ("uvec4", ScalarType::UInt, 4),
    ];
    for &(name, elem, count) in vectors {
        let target = Type::vector(Type::Scalar(elem), IntVal::Const(count));
        let decl = arena.alloc_decl(Decl::new(
            interner.intern(name),
            DeclKind::TypeDef(TypeDefData { target: TypeExpr::resolved(target) }),
        ));
        arena.add_member(module, decl);
    }

    let matrices: &[(&str, i64)] = &[("mat3", 3), ("mat4", 4)];
    for &(name, dim) in matrices {
        let target = Type::Matrix {
            elem: Box::new(Type::float()),
            rows: IntVal::Const(dim),
            cols: IntVal::Const(dim),
        };
        let decl = arena.alloc_decl(Decl::new(
            interner.intern(name),
            DeclKind::TypeDef(TypeDefData { target: TypeExpr::resolved(target) }),
        ));
        arena.add_member(module, decl);
    }
}

/// Intrinsic operator declarations. Calls to these fold during integer
/// constant evaluation, which dispatches on the declaration name.
fn add_intrinsic_operators(arena: &mut AstArena, interner: &StringInterner, module: DeclId) {
    const ARITH: &[&str] = &["+", "-", "*", "/", "%"];
    const COMPARE: &[&str] = &["<", ">", "<=", ">=", "==", "!="];
    const NUMERIC: &[ScalarType] = &[ScalarType::Int, ScalarType::UInt, ScalarType::Float];

    for &scalar in NUMERIC {
        let operand = Type::Scalar(scalar);
        for &op in ARITH {
            let func = make_operator(
                arena,
                interner,
                op,
                &[("left", operand.clone()), ("right", operand.clone())],
                operand.clone(),
                &[Modifier::IntrinsicOp],
            );
            arena.add_member(module, func);
        }
        for &op in COMPARE {
            let func = make_operator(
                arena,
                interner,
                op,
                &[("left", operand.clone()), ("right", operand.clone())],
                Type::bool(),
                &[Modifier::IntrinsicOp],
            );
            arena.add_member(module, func);
        }
    }

    // Unary negation for the signed scalars.
    for scalar in [ScalarType::Int, ScalarType::Float] {
        let operand = Type::Scalar(scalar);
        let func = make_operator(
            arena,
            interner,
            "-",
            &[("value", operand.clone())],
            operand,
            &[Modifier::IntrinsicOp, Modifier::Prefix],
        );
        arena.add_member(module, func);
    }

    // Boolean operators.
    let not = make_operator(
        arena,
        interner,
        "!",
        &[("value", Type::bool())],
        Type::bool(),
        &[Modifier::IntrinsicOp, Modifier::Prefix],
    );
    arena.add_member(module, not);
    for op in ["&&", "||"] {
        let func = make_operator(
            arena,
            interner,
            op,
            &[("left", Type::bool()), ("right", Type::bool())],
            Type::bool(),
            &[Modifier::IntrinsicOp],
        );
        arena.add_member(module, func);
    }
}

fn make_operator(
    arena: &mut AstArena,
    interner: &StringInterner,
    name: &str,
    params: &[(&str, Type)],
    ret: Type,
    modifiers: &[Modifier],
) -> DeclId {
    let mut decl = Decl::new(
        interner.intern(name),
        DeclKind::Func(FuncData {
            members: Members::new(),
            return_ty: TypeExpr::resolved(ret),
            body: None,
        }),
    );
    decl.modifiers.extend_from_slice(modifiers);
    let func = arena.alloc_decl(decl);
    for (pname, ty) in params {
        let param = make_param(arena, interner, pname, ty.clone());
        arena.add_member(func, param);
    }
    func
}
