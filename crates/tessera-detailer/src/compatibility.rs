//! Type compatibility scoring.
//!
//! [`compatibility`] answers "can a value of type `from` be used where `to`
//! is expected, and how good is the fit". Zero means no. Higher scores are
//! tighter fits and drive overload ranking.
//!
//! ## Rules, tightest first
//!
//! | rule | score |
//! |---|---|
//! | identical types | 64 |
//! | identical up to a legal `const` difference | 56 |
//! | `float` and `double` | 48 |
//! | any other pair of natives | 40 |
//! | class upcast at distance `d` | `32 - min(d, 15)` |
//! | `null` to a pointer or optional | 20 |
//! | binding or reading through one reference | inner score - 1 |
//! | value to an optional of a fitting type | 14 |
//! | user `to`/`from` cast | 12 |
//! | union membership | 10 |
//! | `any` on either side | 4 |
//!
//! `const` may be added at any level. It may only be dropped from the
//! outermost level of a value copy: `const int` fits `int`, `const int*` does
//! not fit `int*`, and `const T&` does not fit `T&`.
//!
//! Rules that wrap or cast re-enter the search with new types. The search
//! carries the active `(from, to)` pairs and a depth; re-entering a pair or
//! passing [`DetailOptions::max_compatibility_depth`] scores zero.

use smallvec::SmallVec;
use tracing::{trace, warn};

use tessera_core::{ItemId, Modifier, Type, TypeKind};
use tessera_registry::EntityGraph;

use crate::DetailOptions;

pub const EXACT: u32 = 64;
pub const CONST_ADJUSTED: u32 = 56;
pub const FLOAT_INTERCHANGE: u32 = 48;
pub const NATIVE: u32 = 40;
pub const UPCAST_BASE: u32 = 32;
pub const NULL_POINTER: u32 = 20;
pub const TO_OPTIONAL: u32 = 14;
pub const USER_CAST: u32 = 12;
pub const UNION: u32 = 10;
pub const ANY: u32 = 4;

const MAX_UPCAST_DISTANCE: u32 = 15;

/// A score plus the user cast that achieved it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Compatibility {
    pub score: u32,
    pub cast: Option<ItemId>,
}

impl Compatibility {
    pub const NONE: Compatibility = Compatibility {
        score: 0,
        cast: None,
    };

    pub fn new(score: u32) -> Self {
        Self { score, cast: None }
    }

    pub fn via(score: u32, cast: ItemId) -> Self {
        Self {
            score,
            cast: Some(cast),
        }
    }

    pub fn is_compatible(self) -> bool {
        self.score > 0
    }

    fn capped(self, limit: u32) -> Self {
        Self {
            score: self.score.min(limit),
            cast: self.cast,
        }
    }

    fn through_reference(self) -> Self {
        Self {
            score: self.score.saturating_sub(1).max(1),
            cast: self.cast,
        }
    }
}

/// Score how well `from` fits where `to` is expected. Zero is incompatible.
pub fn compatibility(from: &Type, to: &Type, graph: &EntityGraph, options: &DetailOptions) -> u32 {
    compatibility_match(from, to, graph, options).score
}

/// Like [`compatibility`], also reporting the user cast used.
pub fn compatibility_match(
    from: &Type,
    to: &Type,
    graph: &EntityGraph,
    options: &DetailOptions,
) -> Compatibility {
    CompatibilityCx::new(graph, options).score(from, to)
}

pub fn is_compatible_with(
    from: &Type,
    to: &Type,
    graph: &EntityGraph,
    options: &DetailOptions,
) -> bool {
    compatibility(from, to, graph, options) > 0
}

/// The `from` cast of `class` that best builds it from a `from` value.
pub fn find_from_cast(
    class: ItemId,
    from: &Type,
    graph: &EntityGraph,
    options: &DetailOptions,
) -> Option<ItemId> {
    CompatibilityCx::new(graph, options)
        .from_cast(class, from)
        .and_then(|m| m.cast)
}

/// The `to` cast of `class` (or an ancestor) that best produces a `to`.
pub fn find_to_cast(
    class: ItemId,
    to: &Type,
    graph: &EntityGraph,
    options: &DetailOptions,
) -> Option<ItemId> {
    CompatibilityCx::new(graph, options)
        .to_cast(class, to)
        .and_then(|m| m.cast)
}

/// State of one compatibility search.
pub struct CompatibilityCx<'g> {
    graph: &'g EntityGraph,
    limit: usize,
    depth: usize,
    active: SmallVec<[(Type, Type); 8]>,
    warned: bool,
}

impl<'g> CompatibilityCx<'g> {
    pub fn new(graph: &'g EntityGraph, options: &DetailOptions) -> Self {
        Self {
            graph,
            limit: options.max_compatibility_depth,
            depth: 0,
            active: SmallVec::new(),
            warned: false,
        }
    }

    pub fn score(&mut self, from: &Type, to: &Type) -> Compatibility {
        if from == to {
            return Compatibility::new(EXACT);
        }
        if self.depth >= self.limit {
            self.warn_once(from, to, "compatibility search hit its depth limit");
            return Compatibility::NONE;
        }
        if self.active.iter().any(|(f, t)| f == from && t == to) {
            self.warn_once(from, to, "compatibility search re-entered an active pair");
            return Compatibility::NONE;
        }

        self.active.push((from.clone(), to.clone()));
        self.depth += 1;
        let result = self.rules(from, to);
        self.depth -= 1;
        self.active.pop();

        trace!(
            from = %self.graph.type_name(from),
            to = %self.graph.type_name(to),
            score = result.score,
            "compatibility"
        );
        result
    }

    fn warn_once(&mut self, from: &Type, to: &Type, message: &str) {
        if !self.warned {
            self.warned = true;
            warn!(
                from = %self.graph.type_name(from),
                to = %self.graph.type_name(to),
                depth = self.depth,
                "{message}"
            );
        }
    }

    fn rules(&mut self, from: &Type, to: &Type) -> Compatibility {
        if from.is_wildcard() || to.is_wildcard() {
            return Compatibility::new(ANY);
        }
        if const_adjusted(from, to) {
            return Compatibility::new(CONST_ADJUSTED);
        }
        if from.is_null() && (to.is_pointer() || is_optional_value(to)) {
            return Compatibility::new(NULL_POINTER);
        }

        let through = self.reference_adjusted(from, to);
        if through.is_compatible() {
            return through;
        }

        if let Some(score) = native_score(from, to) {
            return Compatibility::new(score);
        }
        if let Some(score) = self.upcast(from, to) {
            return Compatibility::new(score);
        }
        if to.is_any() && from.indirection_level() > 0 && from.modifiers().len() == to.modifiers().len() {
            return Compatibility::new(ANY);
        }

        let wrapped = self.wrapped(from, to);
        if wrapped.is_compatible() {
            return wrapped;
        }

        self.user_cast(from, to)
    }

    /// Bind a value to a reference destination, or read through a
    /// reference source.
    fn reference_adjusted(&mut self, from: &Type, to: &Type) -> Compatibility {
        let (from_refs, to_refs) = (from.reference_level(), to.reference_level());
        if to_refs > from_refs && to.is_reference() {
            let bound = self.score(&from.reference(), to);
            return if bound.is_compatible() {
                bound.through_reference()
            } else {
                bound
            };
        }
        if from_refs > to_refs
            && let Some(read) = from.dereference()
        {
            let inner = self.score(&read, to);
            if inner.is_compatible() {
                return inner.through_reference();
            }
        }
        Compatibility::NONE
    }

    fn upcast(&self, from: &Type, to: &Type) -> Option<u32> {
        let (derived, base) = (from.class_id()?, to.class_id()?);
        if derived == base || from.pointer_level() > 1 || to.pointer_level() > 1 {
            return None;
        }
        let distance = self.graph.inheritance_distance(derived, base)?;
        if distance == 0 {
            return None;
        }
        let rebased = Type::new(TypeKind::Class(base), from.modifiers().iter().copied());
        if rebased == *to || const_adjusted(&rebased, to) {
            Some(UPCAST_BASE - distance.min(MAX_UPCAST_DISTANCE))
        } else {
            None
        }
    }

    /// Optional and union destinations, and union sources.
    fn wrapped(&mut self, from: &Type, to: &Type) -> Compatibility {
        if to.indirection_level() == 0 {
            if let Some(inner) = to.optional_inner() {
                if from.indirection_level() == 0
                    && let Some(from_inner) = from.optional_inner()
                {
                    let m = self.score(from_inner, inner);
                    return if m.is_compatible() {
                        m.through_reference()
                    } else {
                        m
                    };
                }
                let m = self.score(from, inner);
                if m.is_compatible() {
                    return m.capped(TO_OPTIONAL);
                }
            }
            if let Some(members) = to.union_members() {
                let mut best = Compatibility::NONE;
                for member in members {
                    let m = self.score(from, member);
                    if m.score > best.score {
                        best = m;
                    }
                }
                if best.is_compatible() {
                    return best.capped(UNION);
                }
            }
        }
        if from.indirection_level() == 0
            && let Some(members) = from.union_members()
        {
            let mut worst = u32::MAX;
            for member in members {
                let m = self.score(member, to);
                if !m.is_compatible() {
                    return Compatibility::NONE;
                }
                worst = worst.min(m.score);
            }
            return Compatibility::new(worst.min(UNION));
        }
        Compatibility::NONE
    }

    fn user_cast(&mut self, from: &Type, to: &Type) -> Compatibility {
        let source = from.without_outer_references();
        if source.indirection_level() == 0
            && let Some(class) = source.class_id()
            && let Some(m) = self.to_cast(class, to)
        {
            return m;
        }
        let dest = to.without_outer_references();
        if dest.indirection_level() == 0
            && !dest.is_reference()
            && let Some(class) = dest.class_id()
            && source.class_id() != Some(class)
            && let Some(m) = self.from_cast(class, from)
        {
            return m;
        }
        Compatibility::NONE
    }

    /// Best `to` cast of `class` or its ancestors whose result fits `to`.
    pub fn to_cast(&mut self, class: ItemId, to: &Type) -> Option<Compatibility> {
        let mut best: Option<(u32, ItemId)> = None;
        for owner in self.graph.class_and_ancestors(class) {
            let Some(entity) = self.graph.class(owner) else {
                continue;
            };
            for &cast in &entity.to_casts {
                let Some(function) = self.graph.function(cast) else {
                    continue;
                };
                let produced = function.return_type.clone();
                let m = self.score(&produced, to);
                if m.is_compatible() && best.is_none_or(|(score, _)| m.score > score) {
                    best = Some((m.score, cast));
                }
            }
        }
        best.map(|(_, cast)| Compatibility::via(USER_CAST, cast))
    }

    /// Best `from` cast of `class` whose parameter accepts `from`.
    pub fn from_cast(&mut self, class: ItemId, from: &Type) -> Option<Compatibility> {
        let entity = self.graph.class(class)?;
        let mut best: Option<(u32, ItemId)> = None;
        for &cast in &entity.from_casts {
            let Some(parameter) = self
                .graph
                .function(cast)
                .and_then(|f| f.parameters.first())
                .map(|p| p.ty.clone())
            else {
                continue;
            };
            let m = self.score(from, &parameter);
            if m.is_compatible() && best.is_none_or(|(score, _)| m.score > score) {
                best = Some((m.score, cast));
            }
        }
        best.map(|(_, cast)| Compatibility::via(USER_CAST, cast))
    }
}

fn is_optional_value(ty: &Type) -> bool {
    ty.indirection_level() == 0 && ty.optional_inner().is_some()
}

/// Equal apart from `const` bits, and every dropped `const` is the outermost
/// level of a value copy.
fn const_adjusted(from: &Type, to: &Type) -> bool {
    if from.kind() != to.kind() || strip_const(from) != strip_const(to) {
        return false;
    }
    let (from_levels, to_levels) = (from.constness_by_level(), to.constness_by_level());
    let outermost = from_levels.len() - 1;
    let copied = !to.is_reference();
    from_levels
        .iter()
        .zip(to_levels.iter())
        .enumerate()
        .all(|(level, (&was, &is))| !was || is || (level == outermost && copied))
}

fn strip_const(ty: &Type) -> Type {
    Type::new(
        ty.kind().clone(),
        ty.modifiers().iter().map(|m| m.difference(Modifier::CONSTANT)),
    )
}

fn native_score(from: &Type, to: &Type) -> Option<u32> {
    if from.indirection_level() != 0 || to.indirection_level() != 0 {
        return None;
    }
    let (a, b) = (from.as_native()?, to.as_native()?);
    if !a.is_arithmetic() || !b.is_arithmetic() {
        return None;
    }
    if a != b && a.is_floating() && b.is_floating() {
        Some(FLOAT_INTERCHANGE)
    } else {
        Some(NATIVE)
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::{
        Class, Function, FunctionFlags, ItemHeader, ItemKind, ModuleId, NativeType, ScopeId,
        ScopeOwner, SignatureParameter,
    };

    use super::*;

    struct World {
        graph: EntityGraph,
        module: ModuleId,
        root: ScopeId,
        options: DetailOptions,
    }

    impl World {
        fn new() -> Self {
            let mut graph = EntityGraph::new();
            let module = graph.new_module("main", "main.tsr", "");
            let root = graph.module(module).scope;
            Self {
                graph,
                module,
                root,
                options: DetailOptions::default(),
            }
        }

        fn class(&mut self, name: &str, parents: &[ItemId]) -> ItemId {
            let scope = self.graph.new_scope(self.root, ScopeOwner::Block);
            let mut entity = Class::new(scope);
            entity.parents = parents.to_vec();
            let id = self.graph.add_item(
                ItemHeader::new(name, self.root, self.module),
                ItemKind::Class(entity),
            );
            self.graph.set_scope_owner(scope, ScopeOwner::Class(id));
            id
        }

        fn to_cast(&mut self, class: ItemId, to: Type) -> ItemId {
            let cast = self.cast_function(class, "to", Vec::new(), to);
            self.graph.class_mut(class).unwrap().to_casts.push(cast);
            cast
        }

        fn from_cast(&mut self, class: ItemId, from: Type) -> ItemId {
            let cast = self.cast_function(
                class,
                "from",
                vec![SignatureParameter::new("value", from)],
                Type::class(class),
            );
            self.graph.class_mut(class).unwrap().from_casts.push(cast);
            cast
        }

        fn cast_function(
            &mut self,
            class: ItemId,
            name: &str,
            parameters: Vec<SignatureParameter>,
            ret: Type,
        ) -> ItemId {
            let class_scope = self.graph.class(class).unwrap().scope;
            let scope = self.graph.new_scope(class_scope, ScopeOwner::Block);
            let id = self.graph.add_item(
                ItemHeader::new(name, class_scope, self.module),
                ItemKind::Function(
                    Function::new(scope, ret)
                        .with_parameters(parameters)
                        .with_flags(FunctionFlags::CAST | FunctionFlags::METHOD),
                ),
            );
            self.graph.set_scope_owner(scope, ScopeOwner::Function(id));
            id
        }

        fn score(&self, from: &Type, to: &Type) -> u32 {
            compatibility(from, to, &self.graph, &self.options)
        }
    }

    fn native(n: NativeType) -> Type {
        Type::native(n)
    }

    #[test]
    fn every_type_fits_itself_exactly() {
        let mut world = World::new();
        let point = world.class("Point", &[]);
        let types = [
            Type::int(),
            Type::int().constify(),
            Type::int().point(),
            Type::class(point).reference(),
            Type::null(),
            Type::optional(Type::bool()),
            Type::union([Type::int(), Type::class(point)]),
            Type::any(),
        ];
        for ty in &types {
            assert_eq!(world.score(ty, ty), EXACT, "{ty}");
        }
    }

    #[test]
    fn const_is_added_freely_but_dropped_only_on_copy() {
        let world = World::new();
        let int = Type::int();
        let const_int = Type::new(TypeKind::Native(NativeType::Integer), [Modifier::CONSTANT]);
        assert_eq!(world.score(&int, &const_int), CONST_ADJUSTED);
        assert_eq!(world.score(&const_int, &int), CONST_ADJUSTED);

        let ptr = Type::int().point();
        let ptr_to_const = const_int.point();
        assert_eq!(world.score(&ptr, &ptr_to_const), CONST_ADJUSTED);
        assert_eq!(world.score(&ptr_to_const, &ptr), 0);

        let const_ptr = Type::int().point().constify();
        assert_eq!(world.score(&const_ptr, &ptr), CONST_ADJUSTED);

        let reference = Type::int().reference();
        let const_reference = const_int.reference();
        assert_eq!(world.score(&reference, &const_reference), CONST_ADJUSTED);
        assert_eq!(world.score(&const_reference, &reference), 0);
    }

    #[test]
    fn natives_interchange() {
        let world = World::new();
        let float = native(NativeType::Float);
        let double = native(NativeType::Double);
        assert_eq!(world.score(&float, &double), FLOAT_INTERCHANGE);
        assert_eq!(world.score(&double, &float), FLOAT_INTERCHANGE);
        assert_eq!(world.score(&Type::int(), &float), NATIVE);
        assert_eq!(world.score(&Type::bool(), &Type::int()), NATIVE);
        assert_eq!(world.score(&Type::void(), &Type::int()), 0);
        assert_eq!(world.score(&Type::int().point(), &float.point()), 0);
        assert!(world.score(&Type::int(), &Type::int()) > world.score(&Type::int(), &float));
    }

    #[test]
    fn upcasts_lose_score_with_distance() {
        let mut world = World::new();
        let c = world.class("C", &[]);
        let b = world.class("B", &[c]);
        let a = world.class("A", &[b]);

        let from = Type::class(a).reference();
        let to_a = world.score(&from, &Type::class(a).reference());
        let to_b = world.score(&from, &Type::class(b).reference());
        let to_c = world.score(&from, &Type::class(c).reference());
        assert_eq!(to_a, EXACT);
        assert_eq!(to_b, UPCAST_BASE - 1);
        assert_eq!(to_c, UPCAST_BASE - 2);
        assert!(to_a > to_b && to_b > to_c);

        assert_eq!(
            world.score(&Type::class(a).point(), &Type::class(c).point()),
            UPCAST_BASE - 2
        );
        assert_eq!(world.score(&Type::class(c).reference(), &Type::class(a).reference()), 0);
    }

    #[test]
    fn upcast_never_drops_const_through_indirection() {
        let mut world = World::new();
        let base = world.class("Base", &[]);
        let derived = world.class("Derived", &[base]);
        let const_derived = Type::class(derived).constify().reference();
        assert_eq!(world.score(&const_derived, &Type::class(base).reference()), 0);
        assert_eq!(
            world.score(&Type::class(derived).reference(), &Type::class(base).constify().reference()),
            UPCAST_BASE - 1
        );
    }

    #[test]
    fn references_bind_and_read() {
        let world = World::new();
        let int = Type::int();
        assert_eq!(world.score(&int, &int.reference()), EXACT - 1);
        assert_eq!(world.score(&int.reference(), &int), EXACT - 1);
        assert_eq!(world.score(&int.constify(), &int.reference()), 0);
        assert_eq!(world.score(&int.reference(), &native(NativeType::Double)), NATIVE - 1);
        assert_eq!(world.score(&int, &native(NativeType::Double).reference()), 0);
    }

    #[test]
    fn null_fits_pointers_and_optionals() {
        let world = World::new();
        assert_eq!(world.score(&Type::null(), &Type::int().point()), NULL_POINTER);
        assert_eq!(world.score(&Type::null(), &Type::optional(Type::int())), NULL_POINTER);
        assert_eq!(world.score(&Type::null(), &Type::int()), 0);
    }

    #[test]
    fn optionals_and_unions() {
        let mut world = World::new();
        let point = world.class("Point", &[]);
        let maybe_int = Type::optional(Type::int());
        assert_eq!(world.score(&Type::int(), &maybe_int), TO_OPTIONAL);
        assert_eq!(world.score(&maybe_int, &Type::int()), 0);

        let either = Type::union([Type::int(), Type::class(point)]);
        assert_eq!(world.score(&Type::class(point), &either), UNION);
        assert_eq!(world.score(&either, &Type::int()), 0);
        assert_eq!(world.score(&Type::int().point(), &either), 0);
    }

    #[test]
    fn wildcard_fits_anything_weakly() {
        let mut world = World::new();
        let point = world.class("Point", &[]);
        assert_eq!(world.score(&Type::class(point), &Type::any()), ANY);
        assert_eq!(world.score(&Type::any(), &Type::int().point()), ANY);
    }

    #[test]
    fn user_casts_in_both_directions() {
        let mut world = World::new();
        let celsius = world.class("Celsius", &[]);
        let fahrenheit = world.class("Fahrenheit", &[]);
        let to_double = world.to_cast(celsius, native(NativeType::Double));
        let from_double = world.from_cast(fahrenheit, native(NativeType::Double));

        let m = compatibility_match(
            &Type::class(celsius),
            &native(NativeType::Double),
            &world.graph,
            &world.options,
        );
        assert_eq!(m, Compatibility::via(USER_CAST, to_double));

        let m = compatibility_match(
            &Type::int(),
            &Type::class(fahrenheit),
            &world.graph,
            &world.options,
        );
        assert_eq!(m, Compatibility::via(USER_CAST, from_double));

        assert_eq!(
            find_to_cast(celsius, &Type::int(), &world.graph, &world.options),
            Some(to_double)
        );
        assert_eq!(
            find_from_cast(fahrenheit, &Type::bool(), &world.graph, &world.options),
            Some(from_double)
        );
        assert!(is_compatible_with(
            &Type::class(celsius),
            &Type::class(fahrenheit),
            &world.graph,
            &world.options
        ));
    }

    #[test]
    fn inherited_to_casts_apply() {
        let mut world = World::new();
        let base = world.class("Base", &[]);
        let derived = world.class("Derived", &[base]);
        let cast = world.to_cast(base, Type::bool());
        assert_eq!(
            find_to_cast(derived, &Type::bool(), &world.graph, &world.options),
            Some(cast)
        );
    }

    #[test]
    fn mutually_casting_classes_terminate() {
        let mut world = World::new();
        let p = world.class("P", &[]);
        let q = world.class("Q", &[]);
        world.to_cast(p, Type::class(q));
        world.to_cast(q, Type::class(p));
        assert_eq!(world.score(&Type::class(p), &Type::int()), 0);
        assert_eq!(world.score(&Type::class(p), &Type::class(q)), USER_CAST);
    }

    #[test]
    fn depth_limit_scores_zero() {
        let mut world = World::new();
        let celsius = world.class("Celsius", &[]);
        let fahrenheit = world.class("Fahrenheit", &[]);
        world.to_cast(celsius, native(NativeType::Double));
        world.from_cast(fahrenheit, native(NativeType::Double));
        let (from, to) = (Type::class(celsius), Type::class(fahrenheit));

        world.options = DetailOptions::default().with_max_compatibility_depth(1);
        assert_eq!(world.score(&from, &native(NativeType::Double)), USER_CAST);
        assert_eq!(world.score(&from, &to), 0);

        world.options = DetailOptions::default();
        assert_eq!(world.score(&from, &to), USER_CAST);
    }

    #[test]
    fn point_then_follow_round_trips() {
        let mut world = World::new();
        let point = world.class("Point", &[]);
        for ty in [
            Type::int(),
            Type::int().constify(),
            Type::class(point).reference(),
            Type::optional(Type::bool()),
        ] {
            let back = ty.point().follow().unwrap();
            assert!(back.is_exactly_compatible_with(&ty));
            assert_eq!(world.score(&back, &ty), EXACT);
        }
    }
}
