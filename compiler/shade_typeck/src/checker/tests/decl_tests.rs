//! Declaration-level checking: the state machine, redeclarations,
//! imports, and idempotence.

use shade_ast::{AggData, Decl, DeclKind, ModuleData, Scope, VarData};
use shade_types::{ParamDirection, Type};

use super::{assert_all_checked, assert_reachable_exprs_typed, TestContext};
use crate::request::{MapLoader, SourceLanguage, TranslationUnit};

#[test]
fn circular_typedefs_surface_the_circularity_signal() {
    let mut ctx = TestContext::new();
    let b_ref = ctx.named_type("B");
    ctx.add_typedef("A", b_ref);
    let a_ref = ctx.named_type("A");
    ctx.add_typedef("B", a_ref);

    let err = ctx.check().expect_err("mutually recursive typedefs are circular");
    assert!(err.name == "A" || err.name == "B", "unexpected decl: {}", err.name);
}

#[test]
fn self_referential_typedef_is_circular() {
    let mut ctx = TestContext::new();
    let a_ref = ctx.named_type("A");
    ctx.add_typedef("A", a_ref);

    let err = ctx.check().expect_err("self-referential typedef is circular");
    assert_eq!(err.name, "A");
}

#[test]
fn redeclaration_with_a_different_return_type_is_rejected() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let a1 = ctx.param("a", int_ty, ParamDirection::In);
    let ret1 = ctx.named_type("int");
    ctx.add_func("f", vec![a1], ret1, None);

    let int_ty2 = ctx.named_type("int");
    let a2 = ctx.param("a", int_ty2, ParamDirection::In);
    let ret2 = ctx.named_type("float");
    ctx.add_func("f", vec![a2], ret2, None);

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("different return type"));
}

#[test]
fn redeclaration_with_matching_signature_is_allowed() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let a1 = ctx.param("a", int_ty, ParamDirection::In);
    let ret1 = ctx.named_type("int");
    ctx.add_func("f", vec![a1], ret1, None);

    let int_ty2 = ctx.named_type("int");
    let a2 = ctx.param("a", int_ty2, ParamDirection::In);
    let ret2 = ctx.named_type("int");
    let body = ctx.block(vec![]);
    ctx.add_func("f", vec![a2], ret2, Some(body));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());
}

#[test]
fn out_ness_distinguishes_signatures() {
    // `f(out int)` and `f(int)` do not match, so both declarations may
    // carry bodies.
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let a1 = ctx.param("a", int_ty, ParamDirection::Out);
    let ret1 = ctx.named_type("void");
    let body1 = ctx.block(vec![]);
    ctx.add_func("f", vec![a1], ret1, Some(body1));

    let int_ty2 = ctx.named_type("int");
    let a2 = ctx.param("a", int_ty2, ParamDirection::In);
    let ret2 = ctx.named_type("void");
    let body2 = ctx.block(vec![]);
    ctx.add_func("f", vec![a2], ret2, Some(body2));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());
}

#[test]
fn function_redefinition_is_rejected() {
    let mut ctx = TestContext::new();
    let ret1 = ctx.named_type("void");
    let body1 = ctx.block(vec![]);
    ctx.add_func("f", vec![], ret1, Some(body1));

    let ret2 = ctx.named_type("void");
    let body2 = ctx.block(vec![]);
    ctx.add_func("f", vec![], ret2, Some(body2));

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("function redefinition"));
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let float_ty = ctx.named_type("float");
    let a1 = ctx.param("a", int_ty, ParamDirection::In);
    let a2 = ctx.param("a", float_ty, ParamDirection::In);
    let ret = ctx.named_type("void");
    ctx.add_func("f", vec![a1, a2], ret, None);

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("already defined"));
}

#[test]
fn every_declaration_ends_fully_checked() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let float_ty = ctx.named_type("float");
    ctx.add_struct("S", &[("a", int_ty), ("b", float_ty)]);

    let s_ty = ctx.named_type("S");
    ctx.global_var("s", s_ty, None);

    let one = ctx.int_lit(1);
    let ret = ctx.return_stmt(Some(one));
    let block = ctx.block(vec![ret]);
    let int_ret = ctx.named_type("int");
    ctx.add_func("f", vec![], int_ret, Some(block));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());
    assert_all_checked(&ctx, ctx.module);
    assert_reachable_exprs_typed(&ctx, ctx.module);
}

#[test]
fn rechecking_a_checked_module_is_a_no_op() {
    let mut ctx = TestContext::new();
    let float_ty = ctx.named_type("float");
    let one = ctx.int_lit(1);
    let var = ctx.global_var("x", float_ty, Some(one));

    ctx.check().expect("no circularity");
    let diagnostics_after_first = ctx.sink.diagnostics().len();
    let init_after_first = match &ctx.arena.decl(var).kind {
        DeclKind::Variable(v) => v.init,
        _ => unreachable!(),
    };

    ctx.check().expect("second run must not trip the state machine");
    assert_eq!(ctx.sink.diagnostics().len(), diagnostics_after_first);
    let init_after_second = match &ctx.arena.decl(var).kind {
        DeclKind::Variable(v) => v.init,
        _ => unreachable!(),
    };
    assert_eq!(init_after_first, init_after_second, "the AST did not change");
}

#[test]
fn imported_modules_splice_into_the_lookup_chain() {
    let mut ctx = TestContext::new();

    // Build and check a library module with one struct.
    let lib_name = ctx.intern("lib");
    let lib = ctx
        .arena
        .alloc_decl(Decl::new(lib_name, DeclKind::Module(ModuleData::default())));
    let lib_scope = ctx
        .arena
        .alloc_scope(Scope::new(Some(lib), Some(ctx.session.core_scope)));
    if let DeclKind::Module(data) = &mut ctx.arena.decl_mut(lib).kind {
        data.scope = Some(lib_scope);
    }
    let p_name = ctx.intern("P");
    let p = ctx
        .arena
        .alloc_decl(Decl::new(p_name, DeclKind::Struct(AggData::default())));
    let field_name = ctx.intern("x");
    let field = ctx.arena.alloc_decl(Decl::new(
        field_name,
        DeclKind::Field(VarData {
            ty: shade_ast::TypeExpr::resolved(Type::int()),
            init: None,
        }),
    ));
    ctx.arena.add_member(p, field);
    ctx.arena.add_member(lib, p);

    let lib_unit = TranslationUnit::new(lib, SourceLanguage::Unified);
    let mut loader = MapLoader::new();
    ctx.check_with_loader(&lib_unit, &mut loader)
        .expect("library checks");

    // Importing twice is idempotent.
    loader.register(lib_name, lib);
    ctx.add_import("lib");
    ctx.add_import("lib");

    let p_ty = ctx.named_type("P");
    let var = ctx.global_var("v", p_ty, None);

    let unit = TranslationUnit::new(ctx.module, SourceLanguage::Unified);
    ctx.check_with_loader(&unit, &mut loader)
        .expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match &ctx.arena.decl(var).kind {
        DeclKind::Variable(v) => match v.ty.ty_or_error() {
            Type::DeclRef(dr) => assert_eq!(dr.decl, p),
            other => panic!("expected the imported struct type, got {other:?}"),
        },
        _ => unreachable!(),
    }
}

#[test]
fn typedefs_resolve_to_their_targets() {
    let mut ctx = TestContext::new();
    let vec_ty = ctx.vector_type("float", 4);
    ctx.add_typedef("color", vec_ty);

    let color_ty = ctx.named_type("color");
    let var = ctx.global_var("c", color_ty, None);

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match &ctx.arena.decl(var).kind {
        DeclKind::Variable(v) => {
            assert_eq!(
                v.ty.ty_or_error(),
                Type::vector(Type::float(), shade_types::IntVal::Const(4))
            );
        }
        _ => unreachable!(),
    }
}

#[test]
fn builtin_typedefs_from_the_core_module_resolve() {
    let mut ctx = TestContext::new();
    let vec3_ty = ctx.named_type("vec3");
    let var = ctx.global_var("v", vec3_ty, None);

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match &ctx.arena.decl(var).kind {
        DeclKind::Variable(v) => {
            assert_eq!(
                v.ty.ty_or_error(),
                Type::vector(Type::float(), shade_types::IntVal::Const(3))
            );
        }
        _ => unreachable!(),
    }
}

#[test]
fn extension_members_participate_in_conversion() {
    // A constructor contributed by an extension converts int into S.
    let mut ctx = TestContext::new();
    let s = ctx.add_struct("S", &[]);

    let ext_name = ctx.intern("SExt");
    let target = ctx.named_type("S");
    let ext = ctx.arena.alloc_decl(Decl::new(
        ext_name,
        DeclKind::Extension(shade_ast::ExtensionData {
            target,
            members: shade_ast::Members::new(),
        }),
    ));
    ctx.add_to_module(ext);
    let int_ty = ctx.named_type("int");
    let value = ctx.param("value", int_ty, ParamDirection::In);
    ctx.add_ctor(ext, vec![value], Some(shade_types::ConversionCost::GENERAL));

    let s_ty = ctx.named_type("S");
    let one = ctx.int_lit(1);
    let var = ctx.global_var("s", s_ty, Some(one));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match &ctx.arena.decl(var).kind {
        DeclKind::Variable(v) => {
            let init = v.init.expect("initialized");
            match ctx.arena.expr(init).type_or_error() {
                Type::DeclRef(dr) => assert_eq!(dr.decl, s),
                other => panic!("expected S, got {other:?}"),
            }
        }
        _ => unreachable!(),
    }
}
