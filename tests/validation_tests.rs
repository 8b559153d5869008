//! Validation of detailed programs.

use bumpalo::Bump;
use tessera::core::{BinaryOperator, NativeType};
use tessera::syntax::{RootNode, Stmt};
use tessera::{AstBuilder, Session, ValidationError, ValidationErrorKind};

fn validate<'ast>(arena: &'ast Bump, root: &'ast RootNode<'ast>) -> Result<(), ValidationError> {
    let program = Session::new(arena).detail_root(root).expect("detailing succeeds");
    Session::validate(&program)
}

fn expect_kind<'ast>(arena: &'ast Bump, root: &'ast RootNode<'ast>, kind: ValidationErrorKind) -> ValidationError {
    let error = validate(arena, root).expect_err("validation fails");
    assert_eq!(error.kind, kind, "unexpected error: {error}");
    error
}

fn in_function<'ast>(b: &AstBuilder<'ast>, body: &[Stmt<'ast>]) -> &'ast RootNode<'ast> {
    b.root(&[b.function_stmt(b.function("f", &[b.param("v", b.ty_int())], None, body))])
}

#[test]
fn test_loops_and_branches_validate() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let count = b.function(
        "count",
        &[b.param("limit", b.ty_int())],
        Some(b.ty_int()),
        &[
            b.var("total", Some(b.ty_int()), Some(b.int(0))),
            b.for_(
                Some(b.var("i", Some(b.ty_int()), Some(b.int(0)))),
                Some(b.binary(b.fetch("i"), BinaryOperator::Less, b.fetch("limit"))),
                Some(b.compound_assign(b.fetch("i"), Some(BinaryOperator::Add), b.int(1))),
                b.block_stmt(&[
                    b.if_(
                        b.binary(b.fetch("i"), BinaryOperator::Equal, b.int(3)),
                        b.continue_(),
                        None,
                    ),
                    b.expr_stmt(b.compound_assign(b.fetch("total"), Some(BinaryOperator::Add), b.fetch("i"))),
                ]),
            ),
            b.ret(Some(b.fetch("total"))),
        ],
    );
    let root = b.root(&[b.function_stmt(count)]);
    assert_eq!(validate(&arena, root), Ok(()));
}

#[test]
fn test_missing_return_in_value_function() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let f = b.function("f", &[], Some(b.ty_native(NativeType::Bool)), &[]);
    let root = b.root(&[b.function_stmt(f)]);
    let error = expect_kind(&arena, root, ValidationErrorKind::MissingReturn);
    assert!(error.to_string().contains("(in function f)"));
}

#[test]
fn test_throwing_path_counts_as_exit() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let f = b.function(
        "f",
        &[b.param("v", b.ty_int())],
        Some(b.ty_int()),
        &[b.if_(
            b.binary(b.fetch("v"), BinaryOperator::Greater, b.int(0)),
            b.ret(Some(b.fetch("v"))),
            Some(b.throw(b.fetch("v"))),
        )],
    );
    let root = b.root(&[b.function_stmt(f)]);
    assert_eq!(validate(&arena, root), Ok(()));
}

#[test]
fn test_continue_outside_loop() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = in_function(&b, &[b.continue_()]);
    expect_kind(&arena, root, ValidationErrorKind::OutsideLoop);
}

#[test]
fn test_break_inside_lambda_does_not_see_outer_loop() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let lambda = b.lambda(&[], None, &[b.break_()]);
    let root = in_function(
        &b,
        &[b.while_(b.boolean(true), b.block_stmt(&[b.var("g", None, Some(lambda))]))],
    );
    expect_kind(&arena, root, ValidationErrorKind::OutsideLoop);
}

#[test]
fn test_try_without_catch() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = in_function(&b, &[b.try_catch(&[b.expr_stmt(b.fetch("v"))], &[])]);
    expect_kind(&arena, root, ValidationErrorKind::EmptyTryCatch);
}

#[test]
fn test_persistent_delete_of_value() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = in_function(&b, &[b.delete(b.fetch("v"), true)]);
    expect_kind(&arena, root, ValidationErrorKind::PersistentDelete);
}

#[test]
fn test_persistent_delete_of_pointer() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.class_stmt(b.class("Node", &[], &[])),
        b.function_stmt(b.function(
            "f",
            &[],
            None,
            &[
                b.var("n", None, Some(b.new_persistent(b.ty_named("Node"), &[]))),
                b.delete(b.fetch("n"), true),
            ],
        )),
    ]);
    assert_eq!(validate(&arena, root), Ok(()));
}

#[test]
fn test_variadic_before_last_parameter() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let f = b.function(
        "f",
        &[b.param_variadic("values", b.ty_int()), b.param("tail", b.ty_int())],
        None,
        &[],
    );
    let root = b.root(&[b.function_stmt(f)]);
    expect_kind(&arena, root, ValidationErrorKind::VariadicPosition);
}

#[test]
fn test_assignment_to_rvalue() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = in_function(&b, &[b.expr_stmt(b.assign(b.int(1), b.int(2)))]);
    expect_kind(&arena, root, ValidationErrorKind::NotAssignable);
}

#[test]
fn test_incompatible_assignment() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.class_stmt(b.class("Thing", &[], &[])),
        b.function_stmt(b.function(
            "f",
            &[b.param("v", b.ty_int()), b.param("t", b.ty_named("Thing"))],
            None,
            &[b.expr_stmt(b.assign(b.fetch("v"), b.fetch("t")))],
        )),
    ]);
    expect_kind(&arena, root, ValidationErrorKind::TypeMismatch);
}
