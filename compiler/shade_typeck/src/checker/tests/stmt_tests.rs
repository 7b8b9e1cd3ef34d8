//! Statement and expression-level checks: host statements, return
//! coercion, predicates, swizzles, assignment.

use shade_ast::{ExprKind, StmtKind};
use shade_types::{IntVal, Type};

use super::TestContext;
use crate::request::SourceLanguage;

#[test]
fn break_outside_a_breakable_statement_is_rejected() {
    let mut ctx = TestContext::new();
    let brk = ctx.stmt(StmtKind::Break { host: None });
    let block = ctx.block(vec![brk]);
    let void_ty = ctx.named_type("void");
    ctx.add_func("f", vec![], void_ty, Some(block));

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("`break` outside"));
}

#[test]
fn continue_outside_a_loop_is_rejected() {
    let mut ctx = TestContext::new();
    let cont = ctx.stmt(StmtKind::Continue { host: None });
    let block = ctx.block(vec![cont]);
    let void_ty = ctx.named_type("void");
    ctx.add_func("f", vec![], void_ty, Some(block));

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("`continue` outside"));
}

#[test]
fn break_inside_a_loop_links_to_it() {
    let mut ctx = TestContext::new();
    let brk = ctx.stmt(StmtKind::Break { host: None });
    let body = ctx.block(vec![brk]);
    let cond = ctx.bool_lit(true);
    let loop_stmt = ctx.stmt(StmtKind::While { cond, body });
    let block = ctx.block(vec![loop_stmt]);
    let void_ty = ctx.named_type("void");
    ctx.add_func("f", vec![], void_ty, Some(block));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match ctx.arena.stmt(brk).kind {
        StmtKind::Break { host } => assert_eq!(host, Some(loop_stmt)),
        _ => unreachable!(),
    }
}

#[test]
fn case_and_default_link_to_the_switch() {
    let mut ctx = TestContext::new();
    let tag = ctx.int_lit(0);
    let case_stmt = ctx.stmt(StmtKind::Case { expr: tag, host: None });
    let default_stmt = ctx.stmt(StmtKind::Default { host: None });
    let body = ctx.block(vec![case_stmt, default_stmt]);
    let cond = ctx.int_lit(1);
    let switch_stmt = ctx.stmt(StmtKind::Switch { cond, body });
    let block = ctx.block(vec![switch_stmt]);
    let void_ty = ctx.named_type("void");
    ctx.add_func("f", vec![], void_ty, Some(block));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match ctx.arena.stmt(case_stmt).kind {
        StmtKind::Case { host, .. } => assert_eq!(host, Some(switch_stmt)),
        _ => unreachable!(),
    }
    match ctx.arena.stmt(default_stmt).kind {
        StmtKind::Default { host } => assert_eq!(host, Some(switch_stmt)),
        _ => unreachable!(),
    }
}

#[test]
fn case_outside_a_switch_is_rejected() {
    let mut ctx = TestContext::new();
    let tag = ctx.int_lit(0);
    let case_stmt = ctx.stmt(StmtKind::Case { expr: tag, host: None });
    let block = ctx.block(vec![case_stmt]);
    let void_ty = ctx.named_type("void");
    ctx.add_func("f", vec![], void_ty, Some(block));

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("`case` outside"));
}

#[test]
fn return_value_coerces_to_the_declared_return_type() {
    let mut ctx = TestContext::new();
    let one = ctx.int_lit(1);
    let ret = ctx.return_stmt(Some(one));
    let block = ctx.block(vec![ret]);
    let float_ty = ctx.named_type("float");
    ctx.add_func("f", vec![], float_ty, Some(block));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match ctx.arena.stmt(ret).kind {
        StmtKind::Return { expr: Some(expr) } => {
            assert_eq!(ctx.arena.expr(expr).type_or_error(), Type::float());
        }
        _ => unreachable!(),
    }
}

#[test]
fn bare_return_from_a_non_void_function_is_rejected() {
    let mut ctx = TestContext::new();
    let ret = ctx.return_stmt(None);
    let block = ctx.block(vec![ret]);
    let int_ty = ctx.named_type("int");
    ctx.add_func("f", vec![], int_ty, Some(block));

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("`return` needs an expression"));
}

#[test]
fn predicates_coerce_to_bool() {
    let mut ctx = TestContext::new();
    let cond = ctx.int_lit(1);
    let then_branch = ctx.block(vec![]);
    let if_stmt = ctx.stmt(StmtKind::If { cond, then_branch, else_branch: None });
    let block = ctx.block(vec![if_stmt]);
    let void_ty = ctx.named_type("void");
    ctx.add_func("f", vec![], void_ty, Some(block));

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match ctx.arena.stmt(if_stmt).kind {
        StmtKind::If { cond, .. } => {
            assert_eq!(ctx.arena.expr(cond).type_or_error(), Type::bool());
        }
        _ => unreachable!(),
    }
}

#[test]
fn compile_time_for_requires_constant_bounds() {
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let one = ctx.int_lit(1);
    ctx.global_var("n", int_ty, Some(one));

    let (var, _) = {
        let ty = ctx.named_type("int");
        let void_ty = ctx.named_type("void");
        let (func, _) = ctx.add_func("f", vec![], void_ty, None);
        let (var, _stmt) = ctx.local_var(func, "i", ty, None);
        // Rebuild the function body around a compile-time loop whose end
        // bound is not a constant.
        let end = ctx.var("n");
        let body = ctx.block(vec![]);
        let loop_stmt = ctx.stmt(StmtKind::CompileTimeFor {
            var,
            range_begin: None,
            range_end: end,
            begin_val: None,
            end_val: None,
            body,
        });
        let block = ctx.block(vec![loop_stmt]);
        if let shade_ast::DeclKind::Func(f) = &mut ctx.arena.decl_mut(func).kind {
            f.body = Some(block);
        }
        (var, func)
    };

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("integer constant"));
    // The induction variable still got its `const int` typing.
    assert!(ctx.arena.decl(var).is_const());
}

#[test]
fn compile_time_for_defaults_its_begin_bound() {
    let mut ctx = TestContext::new();
    let ty = ctx.named_type("int");
    let void_ty = ctx.named_type("void");
    let (func, _) = ctx.add_func("f", vec![], void_ty, None);
    let (var, _stmt) = ctx.local_var(func, "i", ty, None);
    let end = ctx.int_lit(4);
    let body = ctx.block(vec![]);
    let loop_stmt = ctx.stmt(StmtKind::CompileTimeFor {
        var,
        range_begin: None,
        range_end: end,
        begin_val: None,
        end_val: None,
        body,
    });
    let block = ctx.block(vec![loop_stmt]);
    if let shade_ast::DeclKind::Func(f) = &mut ctx.arena.decl_mut(func).kind {
        f.body = Some(block);
    }

    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    match &ctx.arena.stmt(loop_stmt).kind {
        StmtKind::CompileTimeFor { begin_val, end_val, .. } => {
            assert_eq!(begin_val, &Some(IntVal::Const(0)));
            assert_eq!(end_val, &Some(IntVal::Const(4)));
        }
        _ => unreachable!(),
    }
}

#[test]
fn swizzles_type_and_lvalue_correctly() {
    let mut ctx = TestContext::new();
    let vec3 = ctx.vector_type("float", 3);
    ctx.global_var("v", vec3, None);
    ctx.check().expect("no circularity");
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());

    // v.xy: a two-component l-value vector.
    let base = ctx.var("v");
    let xy = ctx.member(base, "xy");
    let xy = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(xy))
        .expect("no circularity");
    let qual = ctx.arena.expr(xy).qual_type();
    assert_eq!(qual.ty, Type::vector(Type::float(), IntVal::Const(2)));
    assert!(qual.is_lvalue);

    // v.xx: duplicates make it a non-l-value.
    let base = ctx.var("v");
    let xx = ctx.member(base, "xx");
    let xx = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(xx))
        .expect("no circularity");
    let qual = ctx.arena.expr(xx).qual_type();
    assert_eq!(qual.ty, Type::vector(Type::float(), IntVal::Const(2)));
    assert!(!qual.is_lvalue);

    // v.x: a single component is a scalar, l-value like its base.
    let base = ctx.var("v");
    let x = ctx.member(base, "x");
    let x = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(x))
        .expect("no circularity");
    let qual = ctx.arena.expr(x).qual_type();
    assert_eq!(qual.ty, Type::float());
    assert!(qual.is_lvalue);

    // v.xx.x: the base swizzle is a non-l-value, so the element is too.
    let base = ctx.var("v");
    let xx = ctx.member(base, "xx");
    let x = ctx.member(xx, "x");
    let x = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(x))
        .expect("no circularity");
    assert!(!ctx.arena.expr(x).qual_type().is_lvalue);
}

#[test]
fn swizzle_component_out_of_range_is_rejected() {
    let mut ctx = TestContext::new();
    let vec2 = ctx.vector_type("float", 2);
    ctx.global_var("v", vec2, None);
    ctx.check().expect("no circularity");

    let base = ctx.var("v");
    let z = ctx.member(base, "z");
    let z = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(z))
        .expect("no circularity");

    assert!(ctx.has_error_containing("out of range"));
    assert!(ctx.arena.expr(z).is_error());
}

#[test]
fn scalars_swizzle_like_one_element_vectors() {
    let mut ctx = TestContext::new();
    let float_ty = ctx.named_type("float");
    ctx.global_var("s", float_ty, None);
    ctx.check().expect("no circularity");

    let base = ctx.var("s");
    let x = ctx.member(base, "x");
    let x = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(x))
        .expect("no circularity");
    assert_eq!(ctx.arena.expr(x).type_or_error(), Type::float());

    let base = ctx.var("s");
    let y = ctx.member(base, "y");
    let y = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(y))
        .expect("no circularity");
    assert!(ctx.arena.expr(y).is_error(), "`y` is out of range for a scalar");
}

#[test]
fn assignment_to_a_non_lvalue_is_rejected() {
    let mut ctx = TestContext::new();
    ctx.check().expect("no circularity");

    let left = ctx.int_lit(1);
    let right = ctx.int_lit(2);
    let assign = ctx.assign(left, right);
    let _ = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(assign))
        .expect("no circularity");

    assert!(ctx.has_error_containing("non-l-value"));
}

#[test]
fn assignment_through_a_swizzle_is_allowed() {
    let mut ctx = TestContext::new();
    let vec3 = ctx.vector_type("float", 3);
    ctx.global_var("v", vec3, None);
    ctx.check().expect("no circularity");

    let base = ctx.var("v");
    let x = ctx.member(base, "x");
    let two = ctx.float_lit(2.0);
    let assign = ctx.assign(x, two);
    let checked = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(assign))
        .expect("no circularity");

    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.sink.diagnostics());
    assert_eq!(ctx.arena.expr(checked).type_or_error(), Type::float());
}

#[test]
fn void_is_not_a_valid_variable_type() {
    let mut ctx = TestContext::new();
    let void_ty = ctx.named_type("void");
    ctx.global_var("x", void_ty, None);

    ctx.check().expect("no circularity");
    assert!(ctx.has_error_containing("`void` is not a valid type"));
}

#[test]
fn member_access_expression_kinds_round_trip() {
    // Resolved member references early-exit instead of re-resolving.
    let mut ctx = TestContext::new();
    let int_ty = ctx.named_type("int");
    let s = ctx.add_struct("S", &[("a", int_ty)]);
    let s_ty = ctx.named_type("S");
    ctx.global_var("s", s_ty, None);
    ctx.check().expect("no circularity");

    let base = ctx.var("s");
    let member = ctx.member(base, "a");
    let checked = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(member))
        .expect("no circularity");
    assert_eq!(ctx.arena.expr(checked).type_or_error(), Type::int());
    let ExprKind::Member { decl: Some(dr), .. } = &ctx.arena.expr(checked).kind else {
        panic!("expected a resolved member reference");
    };
    assert_eq!(ctx.arena.decl(dr.decl).parent, Some(s));

    // Checking the resolved node again is a no-op.
    let rechecked = ctx
        .with_visitor(SourceLanguage::Unified, |v| v.check_term(checked))
        .expect("no circularity");
    assert_eq!(rechecked, checked);
}
