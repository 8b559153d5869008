//! Detailing through the public `Session` API.

use bumpalo::Bump;
use tessera::core::{BinaryOperator, DetailingError, FunctionFlags, ItemId, ItemKindSet, ModuleId};
use tessera::detailer::handles::{CallKind, DetailHandle};
use tessera::syntax::{ClassDefinition, RootNode};
use tessera::{AstBuilder, DetailOptions, DetailedProgram, MemoryResolver, Session, TesseraError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn detail<'ast>(arena: &'ast Bump, root: &'ast RootNode<'ast>) -> Result<DetailedProgram<'ast>, TesseraError> {
    init_tracing();
    Session::new(arena).detail_root(root)
}

fn lookup(program: &DetailedProgram<'_>, module: ModuleId, name: &str) -> ItemId {
    let scope = program.graph.module(module).scope;
    let found = program.graph.find_local(name, scope, ItemKindSet::empty(), None);
    *found.first().unwrap_or_else(|| panic!("'{name}' not found"))
}

#[test]
fn test_default_constructor_chains_to_parent() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.class_stmt(b.class("Animal", &[], &[])),
        b.class_stmt(b.class("Dog", &[b.ty_named("Animal")], &[])),
    ]);
    let program = detail(&arena, root).expect("detailing succeeds");

    let animal = lookup(&program, program.root, "Animal");
    let dog = lookup(&program, program.root, "Dog");
    let class = program.graph.class(dog).unwrap();
    assert_eq!(class.parents, vec![animal]);
    assert!(program.graph.has_parent(dog, animal));
    assert!(!program.graph.has_parent(animal, dog));

    let constructor = class.default_constructor.expect("synthesized");
    assert!(program.graph.function(constructor).unwrap().is(FunctionFlags::SYNTHESIZED));
    let chained = program.handles.iter().any(|(_, handle)| {
        matches!(handle.as_call(), Some(call) if call.kind == CallKind::SuperConstructor { class: animal })
    });
    assert!(chained);
    Session::validate(&program).expect("valid");
}

#[test]
fn test_named_arguments_reorder() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let add = b.function(
        "add",
        &[b.param("a", b.ty_int()), b.param("b", b.ty_int())],
        Some(b.ty_int()),
        &[b.ret(Some(b.binary(b.fetch("a"), BinaryOperator::Add, b.fetch("b"))))],
    );
    let call = b.call_args(b.fetch("add"), &[b.named("b", b.int(2)), b.named("a", b.int(1))]);
    let root = b.root(&[b.function_stmt(add), b.var("sum", None, Some(call))]);
    let program = detail(&arena, root).expect("detailing succeeds");

    let frame = program.frame_of(program.root).unwrap();
    let handle = program.handles.get(frame, call.id()).and_then(DetailHandle::as_call).unwrap();
    assert_eq!(handle.resolution.as_ref().unwrap().argument_map, vec![1, 0]);
    assert_eq!(handle.kind, CallKind::Function);
    Session::validate(&program).expect("valid");
}

#[test]
fn test_unknown_function_fails_at_call() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    b.at(7, 2);
    let call = b.call(b.fetch("foo"), &[]);
    let root = b.root(&[b.expr_stmt(call)]);

    let error = detail(&arena, root).expect_err("foo is undefined");
    assert_eq!(error.position(), call.position());
    assert!(matches!(error, TesseraError::Detailing(DetailingError::NoTargetFound { .. })));
    assert!(error.to_string().starts_with("at "));
}

#[test]
fn test_generic_instances_shared_across_uses() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let pair = ClassDefinition {
        generics: b.generics(&["K", "V"]),
        ..b.class(
            "Pair",
            &[],
            &[
                b.field_member(b.field("key", Some(b.ty_named("K")), None)),
                b.field_member(b.field("value", Some(b.ty_named("V")), None)),
            ],
        )
    };
    let pair_ty = || b.ty_generic("Pair", &[b.ty_int(), b.ty_int()]);
    let f = b.function("f", &[b.param("p", pair_ty())], None, &[]);
    let root = b.root(&[
        b.class_stmt(pair),
        b.var("first", Some(pair_ty()), None),
        b.var("second", Some(pair_ty()), None),
        b.function_stmt(f),
    ]);
    let program = detail(&arena, root).expect("detailing succeeds");

    let first = program.graph.variable(lookup(&program, program.root, "first")).unwrap();
    let second = program.graph.variable(lookup(&program, program.root, "second")).unwrap();
    assert!(first.ty.class_id().is_some());
    assert_eq!(first.ty.class_id(), second.ty.class_id());
    Session::validate(&program).expect("valid");
}

#[test]
fn test_imports_through_resolver() {
    init_tracing();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let shapes = b.root(&[
        b.class_stmt(b.class("Circle", &[], &[b.field_member(b.field("r", Some(b.ty_int()), Some(b.int(1))))])),
        b.export(&["Circle"]),
    ]);
    let main = b.root(&[
        b.import("./shapes", &["Circle"]),
        b.var("c", Some(b.ty_named("Circle")), None),
    ]);
    let mut resolver = MemoryResolver::new();
    resolver.add("app/shapes.tsr", "shapes", "app", shapes);
    resolver.add("app/main.tsr", "main", "app", main);

    let program = Session::new(&arena)
        .with_resolver(resolver)
        .check("app/main.tsr")
        .expect("program is valid");
    assert_eq!(program.modules.len(), 2);
    assert_eq!(program.modules.last(), Some(&program.root));

    let shapes_module = program.modules[0];
    assert_eq!(program.graph.module(program.root).dependencies, vec![shapes_module]);
    assert_eq!(program.graph.module(shapes_module).dependents, vec![program.root]);
    let c = program.graph.variable(lookup(&program, program.root, "c")).unwrap();
    let circle = c.ty.class_id().unwrap();
    assert_eq!(program.graph.item(circle).header.module, shapes_module);
}

#[test]
fn test_circular_imports_are_rejected() {
    init_tracing();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let a = b.root(&[b.import_all("./b")]);
    let c = b.root(&[b.import_all("./a")]);
    let mut resolver = MemoryResolver::new();
    resolver.add("a.tsr", "a", "", a);
    resolver.add("b.tsr", "b", "", c);

    let error = Session::new(&arena).with_resolver(resolver).detail("a.tsr").expect_err("cycle");
    assert!(matches!(error, TesseraError::Detailing(DetailingError::CircularImport { .. })));
}

#[test]
fn test_collect_errors_keeps_going() {
    init_tracing();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.expr_stmt(b.call(b.fetch("nope"), &[])),
        b.expr_stmt(b.call(b.fetch("still_nope"), &[])),
        b.var("ok", Some(b.ty_int()), Some(b.int(3))),
    ]);
    let program = Session::with_options(&arena, DetailOptions::new().with_collect_errors(true))
        .detail_root(root)
        .expect("errors are collected");

    assert!(!program.is_clean());
    assert_eq!(program.errors.len(), 2);
    lookup(&program, program.root, "ok");
}
