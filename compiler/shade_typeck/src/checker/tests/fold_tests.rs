//! Integer constant folding and the attribute-checking pass.

use shade_ast::{DeclKind, Modifier};
use shade_types::IntVal;

use super::TestContext;
use crate::request::{CompileFlags, SourceLanguage};

#[test]
fn intrinsic_operator_calls_fold() {
    let mut ctx = TestContext::new();
    ctx.check().expect("no circularity");

    let plus = ctx.var("+");
    let one = ctx.int_lit(1);
    let two = ctx.int_lit(2);
    let sum = ctx.invoke(plus, vec![one, two]);

    let times = ctx.var("*");
    let four = ctx.int_lit(4);
    let product = ctx.invoke(times, vec![sum, four]);

    let folded = ctx.with_visitor(SourceLanguage::Unified, |v| {
        let checked = v.check_term(product)?;
        Ok::<_, crate::Circularity>(v.try_constant_fold_expr(checked))
    });
    assert_eq!(folded.expect("no circularity"), Some(IntVal::Const(12)));
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());
}

#[test]
fn division_by_zero_does_not_fold() {
    let mut ctx = TestContext::new();
    ctx.check().expect("no circularity");

    for op in ["/", "%"] {
        let callee = ctx.var(op);
        let one = ctx.int_lit(1);
        let zero = ctx.int_lit(0);
        let call = ctx.invoke(callee, vec![one, zero]);

        let folded = ctx.with_visitor(SourceLanguage::Unified, |v| {
            let checked = v.check_term(call)?;
            Ok::<_, crate::Circularity>(v.try_constant_fold_expr(checked))
        });
        assert_eq!(folded.expect("no circularity"), None, "`{op}` by zero stays symbolic");
    }
}

#[test]
fn static_const_variables_fold_to_their_initializer() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let eight = ctx.int_lit(8);
    let decl = ctx.global_var("K", int_ty, Some(eight));
    ctx.arena.decl_mut(decl).modifiers.push(Modifier::Static);
    ctx.arena.decl_mut(decl).modifiers.push(Modifier::Const);

    ctx.check_with(SourceLanguage::Hlsl, CompileFlags::default())
        .expect("no circularity");
    assert_eq!(ctx.error_count(), 0);

    let reference = ctx.var("K");
    let folded = ctx.with_visitor(SourceLanguage::Hlsl, |v| {
        let checked = v.check_term(reference)?;
        Ok::<_, crate::Circularity>(v.try_constant_fold_expr(checked))
    });
    assert_eq!(folded.expect("no circularity"), Some(IntVal::Const(8)));
}

#[test]
fn non_const_variables_do_not_fold() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let eight = ctx.int_lit(8);
    ctx.global_var("k", int_ty, Some(eight));
    ctx.check_with(SourceLanguage::Hlsl, CompileFlags::default())
        .expect("no circularity");

    let reference = ctx.var("k");
    let folded = ctx.with_visitor(SourceLanguage::Hlsl, |v| {
        let checked = v.check_term(reference)?;
        Ok::<_, crate::Circularity>(v.try_constant_fold_expr(checked))
    });
    assert_eq!(folded.expect("no circularity"), None);
}

#[test]
fn glsl_specialization_constants_stay_symbolic() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let eight = ctx.int_lit(8);
    let decl = ctx.global_var("K", int_ty, Some(eight));
    ctx.arena.decl_mut(decl).modifiers.push(Modifier::Const);
    ctx.arena.decl_mut(decl).modifiers.push(Modifier::ConstantId(0));

    ctx.check_with(SourceLanguage::Glsl, CompileFlags::default())
        .expect("no circularity");

    let reference = ctx.var("K");
    let folded = ctx.with_visitor(SourceLanguage::Glsl, |v| {
        let checked = v.check_term(reference)?;
        Ok::<_, crate::Circularity>(v.try_constant_fold_expr(checked))
    });
    // A `constant_id` variable is a specialization constant: kept as a
    // symbolic reference, not reduced to its initializer.
    assert_eq!(folded.expect("no circularity"), Some(IntVal::GenericParam(decl)));
}

#[test]
fn glsl_plain_const_folds() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let eight = ctx.int_lit(8);
    let decl = ctx.global_var("K", int_ty, Some(eight));
    ctx.arena.decl_mut(decl).modifiers.push(Modifier::Const);

    ctx.check_with(SourceLanguage::Glsl, CompileFlags::default())
        .expect("no circularity");

    let reference = ctx.var("K");
    let folded = ctx.with_visitor(SourceLanguage::Glsl, |v| {
        let checked = v.check_term(reference)?;
        Ok::<_, crate::Circularity>(v.try_constant_fold_expr(checked))
    });
    assert_eq!(folded.expect("no circularity"), Some(IntVal::Const(8)));
}

#[test]
fn numthreads_attribute_rewrites_to_its_typed_form() {
    let mut ctx = TestContext::new();
    let void_ty = ctx.named_type("void");
    let (func, _) = ctx.add_func("main", vec![], void_ty, None);

    let x = ctx.int_lit(4);
    let y = ctx.int_lit(2);
    let z = ctx.int_lit(1);
    let name = ctx.intern("numthreads");
    ctx.arena
        .decl_mut(func)
        .modifiers
        .push(Modifier::UncheckedAttribute { name, args: vec![x, y, z] });

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    let found = ctx.arena.decl(func).modifiers.iter().any(|m| {
        matches!(m, Modifier::NumThreads { x: 4, y: 2, z: 1 })
    });
    assert!(found, "attribute was rewritten: {:?}", ctx.arena.decl(func).modifiers);
}

#[test]
fn numthreads_with_non_constant_argument_stays_unchecked() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let one = ctx.int_lit(1);
    ctx.global_var("n", int_ty, Some(one));

    let void_ty = ctx.named_type("void");
    let (func, _) = ctx.add_func("main", vec![], void_ty, None);

    let x = ctx.var("n");
    let y = ctx.int_lit(2);
    let z = ctx.int_lit(1);
    let name = ctx.intern("numthreads");
    ctx.arena
        .decl_mut(func)
        .modifiers
        .push(Modifier::UncheckedAttribute { name, args: vec![x, y, z] });

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("integer constant"));
    let unchecked = ctx
        .arena
        .decl(func)
        .modifiers
        .iter()
        .any(|m| matches!(m, Modifier::UncheckedAttribute { .. }));
    assert!(unchecked, "a failing attribute keeps its unchecked form");
}

#[test]
fn wrong_arity_numthreads_is_left_alone() {
    let mut ctx = TestContext::new();
    let void_ty = ctx.named_type("void");
    let (func, _) = ctx.add_func("main", vec![], void_ty, None);

    let x = ctx.int_lit(4);
    let name = ctx.intern("numthreads");
    ctx.arena
        .decl_mut(func)
        .modifiers
        .push(Modifier::UncheckedAttribute { name, args: vec![x] });

    ctx.check().expect("no circularity");
    let unchecked = ctx
        .arena
        .decl(func)
        .modifiers
        .iter()
        .any(|m| matches!(m, Modifier::UncheckedAttribute { .. }));
    assert!(unchecked);
}

#[test]
fn folding_sees_through_parentheses_and_casts() {
    let mut ctx = TestContext::new();
    ctx.check().expect("no circularity");

    let three = ctx.int_lit(3);
    let paren = ctx
        .arena
        .alloc_expr(shade_ast::Expr::new(
            shade_ast::ExprKind::Paren { base: three },
            shade_ast::Span::DUMMY,
        ));

    let folded = ctx.with_visitor(SourceLanguage::Unified, |v| {
        let checked = v.check_term(paren)?;
        Ok::<_, crate::Circularity>(v.try_constant_fold_expr(checked))
    });
    assert_eq!(folded.expect("no circularity"), Some(IntVal::Const(3)));
}

#[test]
fn checked_variables_report_their_states() {
    // Smoke test that the harness state is coherent for the fold tests.
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let lit = ctx.int_lit(5);
    let decl = ctx.global_var("x", int_ty, Some(lit));
    ctx.check().expect("no circularity");
    assert!(matches!(ctx.arena.decl(decl).kind, DeclKind::Variable(_)));
    assert_eq!(ctx.arena.decl(decl).state, shade_ast::CheckState::Checked);
}
