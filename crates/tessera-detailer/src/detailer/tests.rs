use std::cell::RefCell;
use std::rc::Rc;

use bumpalo::Bump;
use tessera_core::{
    AccessorKind, BinaryOperator, DetailingError, FunctionFlags, ItemId, ItemKindSet, ModuleId, NativeType,
    Operator, Orientation, Type,
};
use tessera_syntax::{
    AstBuilder, CastDirection, ClassDefinition, ClassModifiers, FieldDeclaration, FunctionDefinition,
    FunctionModifiers, RootNode, Stmt,
};

use super::*;
use crate::attributes::{AttributeRegistry, AttributeSubject, AttributeTargets, AttributeValue};
use crate::handles::{CallKind, DetailHandle, NameMeaning};
use crate::modules::MemoryResolver;

fn detail<'ast>(arena: &'ast Bump, root: &'ast RootNode<'ast>) -> (Detailer<'ast>, Result<ModuleId>) {
    let mut detailer = Detailer::new(arena, DetailOptions::default());
    let result = detailer.detail_root(root, "main", "main.tsr", "app");
    (detailer, result)
}

fn lookup(detailer: &Detailer<'_>, module: ModuleId, name: &str) -> ItemId {
    let scope = detailer.graph().module(module).scope;
    let found = detailer.graph().find_local(name, scope, ItemKindSet::empty(), None);
    assert!(!found.is_empty(), "'{name}' is not declared");
    found[0]
}

fn frame_of(detailer: &Detailer<'_>, module: ModuleId) -> FrameId {
    detailer
        .roots()
        .iter()
        .find(|root| root.module == module)
        .map(|root| root.frame)
        .expect("module was detailed")
}

#[test]
fn derived_class_gets_default_constructor_calling_super() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.class_stmt(b.class("Dog", &[b.ty_named("Animal")], &[])),
        b.class_stmt(b.class("Animal", &[], &[])),
    ]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");

    let dog = lookup(&detailer, module, "Dog");
    let animal = lookup(&detailer, module, "Animal");
    let graph = detailer.graph();
    let class = graph.class(dog).expect("Dog is a class");
    assert_eq!(class.parents, vec![animal]);
    assert!(graph.has_parent(dog, animal));

    let constructor = class.default_constructor.expect("synthesized constructor");
    let function = graph.function(constructor).expect("constructor is a function");
    assert!(function.is(FunctionFlags::SYNTHESIZED | FunctionFlags::CONSTRUCTOR));
    assert!(function.parameters.is_empty());

    let super_calls = detailer
        .handles()
        .iter()
        .filter(|(_, handle)| {
            matches!(
                handle.as_call(),
                Some(call) if call.kind == CallKind::SuperConstructor { class: animal }
            )
        })
        .count();
    assert_eq!(super_calls, 1);
}

#[test]
fn named_arguments_map_to_parameters() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let add = b.function(
        "add",
        &[b.param("a", b.ty_int()), b.param("b", b.ty_int())],
        Some(b.ty_int()),
        &[b.ret(Some(b.binary(b.fetch("a"), BinaryOperator::Add, b.fetch("b"))))],
    );
    let call = b.call_args(b.fetch("add"), &[b.named("b", b.int(2)), b.named("a", b.int(1))]);
    let root = b.root(&[b.function_stmt(add), b.expr_stmt(call)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");

    let frame = frame_of(&detailer, module);
    let handle = detailer.handles().get(frame, call.id()).and_then(DetailHandle::as_call).expect("call handle");
    let resolution = handle.resolution.as_ref().expect("resolved call");
    assert_eq!(resolution.argument_map, vec![1, 0]);
    assert_eq!(handle.callee, Some(lookup(&detailer, module, "add")));
    assert_eq!(handle.info.ty, Type::int());
}

#[test]
fn undefined_call_reports_call_position() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    b.at(3, 5);
    let call = b.call(b.fetch("foo"), &[]);
    let root = b.root(&[b.expr_stmt(call)]);
    let (_, result) = detail(&arena, root);

    match result {
        Err(DetailingError::NoTargetFound { name, position }) => {
            assert_eq!(name, "foo");
            assert_eq!(position, call.position());
            assert_eq!((position.line, position.column), (3, 5));
        }
        other => panic!("expected NoTargetFound, got {other:?}"),
    }
}

#[test]
fn inner_declarations_shadow_outer_ones() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let inner_fetch = b.fetch("x");
    let outer_fetch = b.fetch("x");
    let body = [
        b.var("x", Some(b.ty_native(NativeType::Bool)), Some(b.boolean(true))),
        b.expr_stmt(inner_fetch),
    ];
    let f = b.function("f", &[], None, &body);
    let g = b.function("g", &[], None, &[b.expr_stmt(outer_fetch)]);
    let root = b.root(&[
        b.var("x", Some(b.ty_int()), Some(b.int(1))),
        b.function_stmt(f),
        b.function_stmt(g),
    ]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);
    let global = lookup(&detailer, module, "x");

    let inner = detailer.handles().get(frame, inner_fetch.id()).and_then(DetailHandle::as_name).expect("name");
    assert_ne!(inner.target, Some(global));
    assert_eq!(inner.info.ty.as_native(), Some(NativeType::Bool));
    assert_eq!(inner.meaning, NameMeaning::Value);

    let outer = detailer.handles().get(frame, outer_fetch.id()).and_then(DetailHandle::as_name).expect("name");
    assert_eq!(outer.target, Some(global));
}

fn generic_box<'ast>(b: &AstBuilder<'ast>) -> ClassDefinition<'ast> {
    ClassDefinition {
        generics: b.generics(&["T"]),
        ..b.class(
            "Box",
            &[],
            &[b.field_member(b.field("value", Some(b.ty_named("T")), None))],
        )
    }
}

#[test]
fn generic_instances_are_memoized() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.class_stmt(generic_box(&b)),
        b.var("a", Some(b.ty_generic("Box", &[b.ty_int()])), None),
        b.var("b", Some(b.ty_generic("Box", &[b.ty_int()])), None),
        b.var("c", Some(b.ty_generic("Box", &[b.ty_native(NativeType::Bool)])), None),
    ]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");

    let template = lookup(&detailer, module, "Box");
    assert_eq!(detailer.instances().class_instance_count(), 2);
    let int_box = detailer
        .instances()
        .get_class_instance(template, &[Type::int()])
        .map(|instance| instance.item)
        .expect("Box<int> instance");

    let graph = detailer.graph();
    let a = graph.variable(lookup(&detailer, module, "a")).expect("a");
    let b_var = graph.variable(lookup(&detailer, module, "b")).expect("b");
    assert_eq!(a.ty.class_id(), Some(int_box));
    assert_eq!(b_var.ty.class_id(), Some(int_box));
    let instance = graph.class(int_box).expect("instance class");
    assert_eq!(instance.generic_origin, Some(template));
    assert_eq!(instance.generic_arguments, vec![Type::int()]);
}

#[test]
fn generic_arity_is_checked() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.class_stmt(generic_box(&b)),
        b.var("a", Some(b.ty_generic("Box", &[b.ty_int(), b.ty_int()])), None),
    ]);
    let (_, result) = detail(&arena, root);
    assert!(matches!(result, Err(DetailingError::GenericArity { .. })));
}

#[test]
fn member_without_default_constructor_blocks_synthesis() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let needs = b.class(
        "Needs",
        &[],
        &[b.method_member(b.constructor(&[b.param("x", b.ty_int())], &[]))],
    );
    let holder = b.class("Holder", &[], &[b.field_member(b.field("n", Some(b.ty_named("Needs")), None))]);
    let root = b.root(&[b.class_stmt(needs), b.class_stmt(holder)]);
    let (_, result) = detail(&arena, root);

    match result {
        Err(DetailingError::NoDefaultConstructor { class, .. }) => assert_eq!(class, "Holder"),
        other => panic!("expected NoDefaultConstructor, got {other:?}"),
    }
}

#[test]
fn initialized_member_does_not_need_default_constructor() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let needs = b.class(
        "Needs",
        &[],
        &[b.method_member(b.constructor(&[b.param("x", b.ty_int())], &[]))],
    );
    let initializer = b.new_object(b.ty_named("Needs"), &[b.int(4)]);
    let holder = b.class(
        "Holder",
        &[],
        &[b.field_member(b.field("n", Some(b.ty_named("Needs")), Some(initializer)))],
    );
    let root = b.root(&[b.class_stmt(needs), b.class_stmt(holder)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");

    let holder = lookup(&detailer, module, "Holder");
    assert!(detailer.graph().class(holder).is_some_and(|c| c.default_constructor.is_some()));
}

#[test]
fn throws_propagate_to_callers_declared_earlier() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let caller = b.function("caller", &[], None, &[b.expr_stmt(b.call(b.fetch("thrower"), &[]))]);
    let thrower = b.function("thrower", &[], None, &[b.throw(b.int(7))]);
    let guarded = b.function(
        "guarded",
        &[],
        None,
        &[b.try_catch(
            &[b.expr_stmt(b.call(b.fetch("thrower"), &[]))],
            &[b.catch(Some("e"), Some(b.ty_int()), &[])],
        )],
    );
    let root = b.root(&[b.function_stmt(caller), b.function_stmt(thrower), b.function_stmt(guarded)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let graph = detailer.graph();

    for name in ["thrower", "caller"] {
        let function = graph.function(lookup(&detailer, module, name)).expect("function");
        assert!(function.throws, "{name} should throw");
        assert!(graph.scope(function.scope).possible_errors.contains(&Type::int()));
    }
    let guarded = graph.function(lookup(&detailer, module, "guarded")).expect("function");
    assert!(!guarded.throws);
}

#[test]
fn catch_clauses_match_by_type_not_by_conversion() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let to_bool = b.cast_function(
        CastDirection::To,
        b.ty_native(NativeType::Bool),
        &[b.ret(Some(b.boolean(true)))],
    );
    let my_error = b.class("MyError", &[], &[b.method_member(to_bool)]);
    let converted = b.function(
        "converted",
        &[],
        None,
        &[b.try_catch(
            &[b.throw(b.call(b.fetch("MyError"), &[]))],
            &[b.catch(Some("e"), Some(b.ty_native(NativeType::Bool)), &[])],
        )],
    );
    let widened = b.function(
        "widened",
        &[],
        None,
        &[b.try_catch(
            &[b.throw(b.int(1))],
            &[b.catch(Some("e"), Some(b.ty_native(NativeType::Double)), &[])],
        )],
    );
    let upcast = b.function(
        "upcast",
        &[],
        None,
        &[b.try_catch(
            &[b.throw(b.call(b.fetch("Derived"), &[]))],
            &[b.catch(Some("e"), Some(b.ty_named("Base")), &[])],
        )],
    );
    let root = b.root(&[
        b.class_stmt(my_error),
        b.class_stmt(b.class("Base", &[], &[])),
        b.class_stmt(b.class("Derived", &[b.ty_named("Base")], &[])),
        b.function_stmt(converted),
        b.function_stmt(widened),
        b.function_stmt(upcast),
    ]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let graph = detailer.graph();
    let my_error = lookup(&detailer, module, "MyError");

    let converted = graph.function(lookup(&detailer, module, "converted")).expect("function");
    assert!(converted.throws, "a bool clause must not catch MyError");
    assert!(
        graph
            .scope(converted.scope)
            .possible_errors
            .iter()
            .any(|error| error.class_id() == Some(my_error))
    );

    let widened = graph.function(lookup(&detailer, module, "widened")).expect("function");
    assert!(widened.throws, "a double clause must not catch int");
    assert!(graph.scope(widened.scope).possible_errors.contains(&Type::int()));

    let upcast = graph.function(lookup(&detailer, module, "upcast")).expect("function");
    assert!(!upcast.throws, "a base class clause catches derived errors");
}

#[test]
fn lambda_captures_outer_locals() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let lambda = b.lambda(&[], Some(b.ty_int()), &[b.ret(Some(b.fetch("n")))]);
    let outer = b.function(
        "outer",
        &[],
        None,
        &[b.var("n", Some(b.ty_int()), Some(b.int(1))), b.var("f", None, Some(lambda))],
    );
    let root = b.root(&[b.function_stmt(outer)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let Some(DetailHandle::Lambda(handle)) = detailer.handles().get(frame, lambda.id()) else {
        panic!("lambda handle missing");
    };
    let graph = detailer.graph();
    let function = graph.function(handle.function).expect("lambda function");
    assert!(function.is_lambda());
    assert_eq!(function.copied_variables.len(), 1);
    let holder = function.capture_holder.expect("capture holder");
    let members = &graph.class(holder).expect("holder class").members;
    assert_eq!(members.len(), 1);
    assert_eq!(graph.item(members[0]).name(), "n");
}

#[test]
fn overloaded_operator_is_preferred() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let plus = b.operator(
        Operator::Binary(BinaryOperator::Add),
        Orientation::Left,
        &[b.param("other", b.ty_named("Vec2"))],
        b.ty_named("Vec2"),
        &[b.ret(Some(b.fetch("other")))],
    );
    let vec2 = b.class(
        "Vec2",
        &[],
        &[
            b.field_member(b.field("x", Some(b.ty_int()), Some(b.int(0)))),
            b.method_member(plus),
        ],
    );
    let sum = b.binary(b.fetch("a"), BinaryOperator::Add, b.fetch("b"));
    let f = b.function(
        "f",
        &[b.param("a", b.ty_named("Vec2")), b.param("b", b.ty_named("Vec2"))],
        None,
        &[b.expr_stmt(sum)],
    );
    let root = b.root(&[b.class_stmt(vec2), b.function_stmt(f)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let Some(DetailHandle::Operator(handle)) = detailer.handles().get(frame, sum.id()) else {
        panic!("operator handle missing");
    };
    assert!(handle.overload.is_some());
    assert_eq!(handle.info.ty.class_id(), Some(lookup(&detailer, module, "Vec2")));
}

#[test]
fn native_operands_use_native_typing() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let sum = b.binary(b.int(1), BinaryOperator::Add, b.double(2.5));
    let compare = b.binary(b.int(1), BinaryOperator::Less, b.int(2));
    let root = b.root(&[b.expr_stmt(sum), b.expr_stmt(compare)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let ty = |id| detailer.handles().info(frame, id).map(|info| info.ty.as_native());
    assert_eq!(ty(sum.id()), Some(Some(NativeType::Double)));
    assert_eq!(ty(compare.id()), Some(Some(NativeType::Bool)));
}

fn bitfield_field<'ast>(b: &AstBuilder<'ast>, name: &str, bits: u32) -> FieldDeclaration<'ast> {
    FieldDeclaration {
        bits: Some(bits),
        ..b.field(name, Some(b.ty_int()), None)
    }
}

#[test]
fn bitfield_overflow_is_reported() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let flags = ClassDefinition {
        modifiers: ClassModifiers::BITFIELD,
        bitfield_type: Some(b.ty_native(NativeType::Byte)),
        ..b.class(
            "Flags",
            &[],
            &[
                b.field_member(bitfield_field(&b, "low", 5)),
                b.field_member(bitfield_field(&b, "high", 4)),
            ],
        )
    };
    let root = b.root(&[b.class_stmt(flags)]);
    let (_, result) = detail(&arena, root);

    match result {
        Err(DetailingError::BitfieldOverflow { bits, capacity, .. }) => {
            assert_eq!(bits, 9);
            assert_eq!(capacity, 8);
        }
        other => panic!("expected BitfieldOverflow, got {other:?}"),
    }
}

#[test]
fn omitted_defaults_call_optional_variant() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let greet = b.function(
        "greet",
        &[b.param("name", b.ty_int()), b.param_default("times", b.ty_int(), b.int(1))],
        None,
        &[],
    );
    let call = b.call(b.fetch("greet"), &[b.int(5)]);
    let root = b.root(&[b.function_stmt(greet), b.expr_stmt(call)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let canonical = lookup(&detailer, module, "greet");
    let graph = detailer.graph();
    let variants = &graph.function(canonical).expect("function").optional_variants;
    assert_eq!(variants.len(), 1);

    let callee = detailer
        .handles()
        .get(frame, call.id())
        .and_then(DetailHandle::as_call)
        .and_then(|call| call.callee)
        .expect("resolved callee");
    assert_eq!(callee, variants[0]);
    let variant = graph.function(callee).expect("variant");
    assert_eq!(variant.optional_variant_parent, Some(canonical));
    assert_eq!(variant.parameters.len(), 1);
}

#[test]
fn imports_bind_exported_items() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let square = b.function(
        "square",
        &[b.param("v", b.ty_int())],
        Some(b.ty_int()),
        &[b.ret(Some(b.binary(b.fetch("v"), BinaryOperator::Mul, b.fetch("v"))))],
    );
    let math = b.root(&[b.function_stmt(square), b.export(&["square"])]);
    let mut resolver = MemoryResolver::new();
    resolver.add("math.tsr", "math", "app", math);

    let call = b.call(b.fetch("square"), &[b.int(3)]);
    let main = b.root(&[b.import("./math", &["square"]), b.expr_stmt(call)]);
    let mut detailer = Detailer::new(&arena, DetailOptions::default()).with_resolver(resolver);
    let module = detailer.detail_root(main, "main", "main.tsr", "app").expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let callee = detailer
        .handles()
        .get(frame, call.id())
        .and_then(DetailHandle::as_call)
        .and_then(|call| call.callee)
        .expect("resolved callee");
    assert_eq!(detailer.graph().item(callee).name(), "square");
    assert_ne!(detailer.graph().item(callee).header.module, module);
    assert_eq!(detailer.graph().module(module).dependencies.len(), 1);
}

#[test]
fn import_without_resolver_fails() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[b.import_all("./missing")]);
    let (_, result) = detail(&arena, root);
    assert!(matches!(result, Err(DetailingError::ModuleNotFound { .. })));
}

#[test]
fn collected_errors_do_not_stop_detailing() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[
        b.expr_stmt(b.call(b.fetch("missing"), &[])),
        b.var("x", Some(b.ty_int()), Some(b.int(1))),
    ]);
    let mut detailer = Detailer::new(&arena, DetailOptions::new().with_collect_errors(true));
    let module = detailer.detail_root(root, "main", "main.tsr", "app").expect("errors are collected");

    assert_eq!(detailer.errors().len(), 1);
    assert!(matches!(detailer.errors()[0], DetailingError::NoTargetFound { .. }));
    lookup(&detailer, module, "x");
}

#[test]
fn detailing_a_path_twice_returns_the_same_module() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[]);
    let mut detailer = Detailer::new(&arena, DetailOptions::default());
    let first = detailer.detail_root(root, "main", "main.tsr", "app").expect("first");
    let second = detailer.detail_root(root, "main", "main.tsr", "app").expect("second");
    assert_eq!(first, second);
    assert_eq!(detailer.roots().len(), 1);
}

#[test]
fn ranged_for_binds_the_optional_inner_type() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let next = b.function("next", &[], Some(b.ty_optional(b.ty_int())), &[b.ret(Some(b.null()))]);
    let ranged = b.ranged_for(
        "x",
        b.fetch("it"),
        b.block_stmt(&[b.var("y", Some(b.ty_int()), Some(b.fetch("x")))]),
    );
    let walk = b.function("walk", &[b.param("it", b.ty_named("Iter"))], None, &[ranged]);
    let root = b.root(&[
        b.class_stmt(b.class("Iter", &[], &[b.method_member(next)])),
        b.function_stmt(walk),
    ]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let Some(DetailHandle::RangedFor(handle)) = detailer.handles().get(frame, ranged.id()) else {
        panic!("ranged for handle missing");
    };
    assert_eq!(handle.element, Type::int());
    let variable = detailer.graph().variable(handle.variable).expect("loop variable");
    assert_eq!(variable.ty, Type::int());
    assert_eq!(detailer.graph().item(handle.next).name(), "next");
}

#[test]
fn ranged_for_needs_next() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let ranged = b.ranged_for("x", b.fetch("p"), b.block_stmt(&[]));
    let walk = b.function("walk", &[b.param("p", b.ty_named("Plain"))], None, &[ranged]);
    let root = b.root(&[b.class_stmt(b.class("Plain", &[], &[])), b.function_stmt(walk)]);
    let (_, result) = detail(&arena, root);
    match result {
        Err(DetailingError::MissingIterator { ty, .. }) => assert_eq!(ty, "Plain"),
        other => panic!("expected MissingIterator, got {other:?}"),
    }
}

fn property_access<'ast>(
    b: &AstBuilder<'ast>,
    kind: AccessorKind,
    body: &[Stmt<'ast>],
) -> &'ast RootNode<'ast> {
    let accessor_body = match kind {
        AccessorKind::Get => vec![b.ret(Some(b.int(1)))],
        AccessorKind::Set => Vec::new(),
    };
    let accessor = b.accessor(kind, "v", b.ty_int(), &accessor_body);
    b.root(&[
        b.class_stmt(b.class("Box", &[], &[b.method_member(accessor)])),
        b.function_stmt(b.function("use_box", &[b.param("box", b.ty_named("Box"))], None, body)),
    ])
}

fn expect_property_error(result: Result<ModuleId>, missing: &str) {
    match result {
        Err(DetailingError::Other { message, .. }) => {
            assert!(message.contains(&format!("has no {missing}")), "unexpected message: {message}");
        }
        other => panic!("expected a missing {missing}, got {other:?}"),
    }
}

#[test]
fn getter_reads_property() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let read = b.member(b.fetch("box"), "v");
    let root = property_access(&b, AccessorKind::Get, &[b.var("r", Some(b.ty_int()), Some(read))]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let Some(DetailHandle::Accessor(handle)) = detailer.handles().get(frame, read.id()) else {
        panic!("accessor handle missing");
    };
    assert!(matches!(handle.meaning, NameMeaning::Property { getter: Some(_), setter: None }));
    assert_eq!(handle.info.ty, Type::int());
}

#[test]
fn writing_a_getter_only_property_fails() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let write = b.assign(b.member(b.fetch("box"), "v"), b.int(2));
    let root = property_access(&b, AccessorKind::Get, &[b.expr_stmt(write)]);
    let (_, result) = detail(&arena, root);
    expect_property_error(result, "setter");
}

#[test]
fn reading_a_setter_only_property_fails() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let read = b.member(b.fetch("box"), "v");
    let root = property_access(&b, AccessorKind::Set, &[b.var("r", Some(b.ty_int()), Some(read))]);
    let (_, result) = detail(&arena, root);
    expect_property_error(result, "getter");
}

#[test]
fn namespaces_and_using_aliases() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let area = b.function("area", &[], Some(b.ty_int()), &[b.ret(Some(b.int(4)))]);
    let through_alias = b.call(b.fetch("size"), &[]);
    let qualified = b.call(b.member(b.fetch("geo"), "area"), &[]);
    let root = b.root(&[
        b.namespace("geo", &[b.function_stmt(area)]),
        b.using(&["geo", "area"], Some("size")),
        b.var("a", None, Some(through_alias)),
        b.var("c", None, Some(qualified)),
    ]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let graph = detailer.graph();

    let geo = lookup(&detailer, module, "geo");
    let geo_scope = graph.item(geo).own_scope().expect("namespace scope");
    let area = graph.find_local("area", geo_scope, ItemKindSet::empty(), None)[0];
    assert_eq!(lookup(&detailer, module, "size"), area);

    let frame = frame_of(&detailer, module);
    for call in [through_alias, qualified] {
        let callee = detailer.handles().get(frame, call.id()).and_then(DetailHandle::as_call).and_then(|c| c.callee);
        assert_eq!(callee, Some(area));
    }
    for name in ["a", "c"] {
        let variable = graph.variable(lookup(&detailer, module, name)).expect("variable");
        assert_eq!(variable.ty, Type::int());
    }
}

#[test]
fn using_an_unknown_member_fails() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let root = b.root(&[b.namespace("geo", &[]), b.using(&["geo", "missing"], None)]);
    let (_, result) = detail(&arena, root);
    match result {
        Err(DetailingError::NoTargetFound { name, .. }) => assert_eq!(name, "geo.missing"),
        other => panic!("expected NoTargetFound, got {other:?}"),
    }
}

fn with_modifiers<'ast>(def: FunctionDefinition<'ast>, modifiers: FunctionModifiers) -> FunctionDefinition<'ast> {
    FunctionDefinition { modifiers, ..def }
}

#[test]
fn yield_and_await_inside_their_functions() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let yielded = b.yield_(Some(b.int(1)));
    let count = with_modifiers(
        b.function("count", &[], Some(b.ty_int()), &[b.expr_stmt(yielded)]),
        FunctionModifiers::GENERATOR,
    );
    let load = with_modifiers(
        b.function("load", &[], Some(b.ty_int()), &[b.ret(Some(b.int(1)))]),
        FunctionModifiers::ASYNC,
    );
    let awaited = b.await_(b.call(b.fetch("load"), &[]));
    let run = with_modifiers(
        b.function("run", &[], None, &[b.var("v", None, Some(awaited))]),
        FunctionModifiers::ASYNC,
    );
    let root = b.root(&[b.function_stmt(count), b.function_stmt(load), b.function_stmt(run)]);
    let (detailer, result) = detail(&arena, root);
    let module = result.expect("detailing succeeds");
    let frame = frame_of(&detailer, module);

    let Some(DetailHandle::Yield(handle)) = detailer.handles().get(frame, yielded.id()) else {
        panic!("yield handle missing");
    };
    assert_eq!(handle.function, lookup(&detailer, module, "count"));
    let Some(DetailHandle::Await(handle)) = detailer.handles().get(frame, awaited.id()) else {
        panic!("await handle missing");
    };
    assert_eq!(handle.function, lookup(&detailer, module, "run"));
    assert_eq!(handle.info.ty, Type::int());
}

#[test]
fn yield_and_await_outside_their_functions_fail() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    for (construct, value) in [("yield", b.yield_(None)), ("await", b.await_(b.int(1)))] {
        let plain = b.function("plain", &[], None, &[b.expr_stmt(value)]);
        let root = b.root(&[b.function_stmt(plain)]);
        let (_, result) = detail(&arena, root);
        match result {
            Err(DetailingError::InvalidContext { construct: found, .. }) => assert_eq!(found, construct),
            other => panic!("expected InvalidContext for {construct}, got {other:?}"),
        }
    }
}

fn reexport_resolver<'ast>(b: &AstBuilder<'ast>) -> MemoryResolver<'ast> {
    let shapes = b.root(&[b.class_stmt(b.class("Circle", &[], &[])), b.export(&["Circle"])]);
    let hub = b.root(&[b.export_from("./shapes", &["Circle"])]);
    let all = b.root(&[b.export_all_from("./shapes")]);
    let mut resolver = MemoryResolver::new();
    resolver
        .add("shapes.tsr", "shapes", "app", shapes)
        .add("hub.tsr", "hub", "app", hub)
        .add("all.tsr", "all", "app", all);
    resolver
}

#[test]
fn reexported_items_reach_importers() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let main = b.root(&[
        b.import("./hub", &["Circle"]),
        b.import_as("./all", "geo"),
        b.var("c", Some(b.ty_named("Circle")), None),
        b.var("d", Some(b.ty_path(&["geo", "Circle"])), None),
    ]);
    let mut detailer = Detailer::new(&arena, DetailOptions::default()).with_resolver(reexport_resolver(&b));
    let module = detailer.detail_root(main, "main", "main.tsr", "app").expect("detailing succeeds");
    let graph = detailer.graph();

    let c = graph.variable(lookup(&detailer, module, "c")).expect("variable").ty.class_id();
    let d = graph.variable(lookup(&detailer, module, "d")).expect("variable").ty.class_id();
    let circle = c.expect("Circle is a class");
    assert_eq!(d, Some(circle));
    assert_eq!(graph.item(circle).name(), "Circle");
    assert_eq!(graph.item(circle).header.module, detailer.roots()[0].module);
    assert_eq!(graph.module(module).dependencies.len(), 2);
}

#[test]
fn importing_what_was_not_reexported_fails() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let main = b.root(&[b.import("./hub", &["Square"])]);
    let mut detailer = Detailer::new(&arena, DetailOptions::default()).with_resolver(reexport_resolver(&b));
    match detailer.detail_root(main, "main", "main.tsr", "app") {
        Err(DetailingError::NoTargetFound { name, .. }) => assert_eq!(name, "Square"),
        other => panic!("expected NoTargetFound, got {other:?}"),
    }
}

#[test]
fn attribute_callbacks_receive_evaluated_arguments() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let seen: Rc<RefCell<Vec<(AttributeSubject, Vec<AttributeValue>)>>> = Rc::default();
    let mut attributes = AttributeRegistry::new();
    let sink = Rc::clone(&seen);
    attributes.register("tune.hint", AttributeTargets::FUNCTION, move |_, invocation| {
        sink.borrow_mut().push((invocation.subject, invocation.arguments.to_vec()));
        Ok(())
    });

    let tag = b.attribute(
        &["tune", "hint"],
        &[
            b.attribute_expr(b.int(3)),
            b.attribute_expr(b.string("fast")),
            b.attribute_type(b.ty_int()),
            b.attribute_expr(b.fetch("helper")),
        ],
    );
    let work = FunctionDefinition {
        attributes: b.slice(&[tag]),
        ..b.function("work", &[], None, &[])
    };
    let helper = b.function("helper", &[], None, &[]);
    let root = b.root(&[b.function_stmt(work), b.function_stmt(helper)]);
    let mut detailer = Detailer::new(&arena, DetailOptions::default()).with_attributes(attributes);
    let module = detailer.detail_root(root, "main", "main.tsr", "app").expect("detailing succeeds");

    let work = lookup(&detailer, module, "work");
    let helper = lookup(&detailer, module, "helper");
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, AttributeSubject::Function(work));
    assert_eq!(
        seen[0].1,
        vec![
            AttributeValue::Int(3),
            AttributeValue::String("fast".to_string()),
            AttributeValue::Type(Type::int()),
            AttributeValue::Item(helper),
        ]
    );
}

#[test]
fn rejected_attribute_becomes_an_error() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let mut attributes = AttributeRegistry::new();
    attributes.register("pure", AttributeTargets::FUNCTION, |_, _| Err("has side effects".to_string()));

    let work = FunctionDefinition {
        attributes: b.slice(&[b.attribute(&["pure"], &[])]),
        ..b.function("work", &[], None, &[])
    };
    let root = b.root(&[b.function_stmt(work)]);
    let mut detailer = Detailer::new(&arena, DetailOptions::default()).with_attributes(attributes);
    match detailer.detail_root(root, "main", "main.tsr", "app") {
        Err(DetailingError::Attribute { name, message, .. }) => {
            assert_eq!(name, "pure");
            assert_eq!(message, "has side effects");
        }
        other => panic!("expected an attribute error, got {other:?}"),
    }
}
