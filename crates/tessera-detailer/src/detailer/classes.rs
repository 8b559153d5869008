//! Class declarations, member signatures and special member synthesis.

use tracing::{debug, trace};

use tessera_core::{
    Class, ClassFlags, DetailingError, FunctionFlags, ItemHeader, ItemId, ItemKind, ItemKindSet,
    Modifier, NativeType, ScopeId, ScopeOwner, Type, TypeKind, Variable, Visibility,
};
use tessera_syntax::{ClassDefinition, ClassModifiers, FunctionDefinition};

use super::{ClassProgress, ClassSource, Detailer, Frame, Result, Template};
use crate::attributes::AttributeSubject;
use crate::generics::inferred_type;
use crate::handles::{ClassHandle, DetailHandle};

impl<'ast> Detailer<'ast> {
    /// Create the class item and its scope. Generic classes stop here and
    /// are kept as templates.
    pub(crate) fn declare_class(
        &mut self,
        frame: Frame,
        def: &'ast ClassDefinition<'ast>,
        scope: ScopeId,
    ) -> Result<ItemId> {
        if let Some(item) = self.declared_item(frame, def.id) {
            return Ok(item);
        }
        let name = def.name.name;
        self.check_redeclaration(name, scope, def.position)?;

        let item = if def.is_generic() {
            let class_scope = self.graph.new_scope(scope, ScopeOwner::Block);
            let header = ItemHeader::new(name, scope, frame.module)
                .with_visibility(def.visibility)
                .with_position(def.position)
                .with_generic_parameters(def.generics.len());
            let class = Class::new(class_scope).with_flags(class_flags(def.modifiers));
            let item = self.graph.add_item(header, ItemKind::Class(class));
            self.graph.set_scope_owner(class_scope, ScopeOwner::Class(item));
            self.templates.insert(
                item,
                Template::Class {
                    def,
                    scope,
                    module: frame.module,
                },
            );
            let handle = ClassHandle {
                class: item,
                synthesized: Vec::new(),
                is_template: true,
            };
            self.store(frame, def.id, DetailHandle::Class(handle), def.position)?;
            debug!(name, "declared generic class");
            item
        } else {
            self.create_class_entity(frame, def, scope, name)
        };

        if def.modifiers.contains(ClassModifiers::EXPORT) && self.graph.module(frame.module).scope == scope {
            self.export_item(frame.module, name, item, def.position)?;
        }
        self.record_declared(frame, def.id, item);
        Ok(item)
    }

    /// Allocate a concrete class, its scope and `this`, and queue it for
    /// member detailing.
    pub(crate) fn create_class_entity(
        &mut self,
        frame: Frame,
        def: &'ast ClassDefinition<'ast>,
        scope: ScopeId,
        name: &str,
    ) -> ItemId {
        let class_scope = self.graph.new_scope(scope, ScopeOwner::Block);
        let class = Class::new(class_scope).with_flags(class_flags(def.modifiers));
        let is_structure = class.is_structure();
        let header = ItemHeader::new(name, scope, frame.module)
            .with_visibility(def.visibility)
            .with_position(def.position);
        let item = self.graph.add_item(header, ItemKind::Class(class));
        self.graph.set_scope_owner(class_scope, ScopeOwner::Class(item));

        if !is_structure {
            let header = ItemHeader::new("this", class_scope, frame.module)
                .with_visibility(Visibility::Private)
                .with_position(def.position);
            let this = self
                .graph
                .add_item(header, ItemKind::Variable(Variable::new(Type::class(item))));
            if let Some(class) = self.graph.class_mut(item) {
                class.this_variable = Some(this);
            }
        }

        self.classes.insert(
            item,
            ClassSource {
                def,
                frame,
                progress: ClassProgress::Declared,
            },
        );
        debug!(name, %item, "declared class");
        item
    }

    fn set_progress(&mut self, class: ItemId, progress: ClassProgress) {
        if let Some(source) = self.classes.get_mut(&class) {
            source.progress = progress;
        }
    }

    /// Resolve parents, fields and member function signatures.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn class_signatures(&mut self, item: ItemId) -> Result<()> {
        let Some(source) = self.classes.get(&item).copied() else {
            return Ok(());
        };
        if source.progress >= ClassProgress::Signatures {
            return Ok(());
        }
        self.set_progress(item, ClassProgress::Signatures);
        let ClassSource { def, frame, .. } = source;
        let class_scope = self
            .graph
            .class(item)
            .map(|c| c.scope)
            .ok_or_else(|| DetailingError::internal("class entity missing"))?;

        let parents = self.resolve_parents(frame, def, item, class_scope)?;
        if let Some(class) = self.graph.class_mut(item) {
            class.parents = parents;
        }

        let is_bitfield = def.modifiers.contains(ClassModifiers::BITFIELD);
        if is_bitfield {
            let underlying = match &def.bitfield_type {
                Some(ty) => self.resolve_type(frame, ty, class_scope)?,
                None => Type::int(),
            };
            let integral = underlying.indirection_level() == 0
                && underlying
                    .as_native()
                    .is_some_and(|n| n.is_integral() || n == NativeType::Bool);
            if !integral {
                return Err(DetailingError::other(
                    def.position,
                    format!("bitfield type '{}' is not integral", self.type_name(&underlying)),
                ));
            }
            if let Some(class) = self.graph.class_mut(item) {
                class.underlying_bitfield_type = Some(underlying);
            }
        }

        let mut total_bits = 0u32;
        for field in def.fields() {
            let name = field.name.name;
            if !self
                .graph
                .find_local(name, class_scope, ItemKindSet::empty(), None)
                .is_empty()
            {
                return Err(DetailingError::DuplicateDefinition {
                    name: name.to_string(),
                    position: field.position,
                });
            }
            let ty = match (&field.ty, field.initializer) {
                (Some(ty), _) => self.resolve_type(frame, ty, class_scope)?,
                (None, Some(initializer)) => {
                    let info = self.detail_expr(frame, initializer, class_scope)?;
                    inferred_type(&info.ty)
                }
                (None, None) => {
                    return Err(DetailingError::other(
                        field.position,
                        format!("field '{name}' needs a type or an initializer"),
                    ));
                }
            };
            let ty = if field.is_constant { ty.constify() } else { ty };
            let variable = match (is_bitfield, field.bits) {
                (true, Some(bits)) => {
                    total_bits = total_bits.saturating_add(bits);
                    Variable::bitfield_entry(ty, bits)
                }
                (false, None) => Variable::member(ty),
                (true, None) => {
                    return Err(DetailingError::other(
                        field.position,
                        format!("bitfield member '{name}' needs a bit width"),
                    ));
                }
                (false, Some(_)) => {
                    return Err(DetailingError::other(
                        field.position,
                        format!("'{name}' has a bit width outside a bitfield class"),
                    ));
                }
            };
            let header = ItemHeader::new(name, class_scope, frame.module)
                .with_visibility(field.visibility)
                .with_position(field.position);
            let member = self.graph.add_item(header, ItemKind::Variable(variable));
            if let Some(class) = self.graph.class_mut(item) {
                class.members.push(member);
            }
            self.record_declared(frame, field.id, member);
        }

        if is_bitfield {
            self.check_bitfield_capacity(item, total_bits, def)?;
        }

        if def.modifiers.contains(ClassModifiers::STRUCTURE)
            && let Some(function) = def.functions().next()
        {
            return Err(DetailingError::InvalidContext {
                construct: "member function".to_string(),
                requirement: "in classes, not structures".to_string(),
                position: function.position,
            });
        }
        for function in def.functions() {
            self.declare_function(frame, function, class_scope, Some(item))?;
        }
        trace!(class = %def.name.name, "class signatures done");
        Ok(())
    }

    fn resolve_parents(
        &mut self,
        frame: Frame,
        def: &ClassDefinition<'ast>,
        item: ItemId,
        class_scope: ScopeId,
    ) -> Result<Vec<ItemId>> {
        let mut parents = Vec::with_capacity(def.parents.len());
        for written in def.parents {
            let ty = self.resolve_type(frame, written, class_scope)?;
            let parent = match (ty.class_id(), ty.indirection_level()) {
                (Some(parent), 0) => parent,
                _ => {
                    return Err(DetailingError::other(
                        written.position,
                        format!("cannot inherit from '{}'", self.type_name(&ty)),
                    ));
                }
            };
            self.class_signatures(parent)?;
            if parent == item || self.graph.has_parent(parent, item) {
                return Err(DetailingError::other(
                    written.position,
                    format!("cyclic inheritance through '{}'", self.item_name(parent)),
                ));
            }
            if parents.contains(&parent) {
                return Err(DetailingError::DuplicateDefinition {
                    name: self.item_name(parent),
                    position: written.position,
                });
            }
            parents.push(parent);
        }
        Ok(parents)
    }

    fn check_bitfield_capacity(&self, item: ItemId, bits: u32, def: &ClassDefinition<'_>) -> Result<()> {
        let Some(underlying) = self.graph.class(item).and_then(|c| c.underlying_bitfield_type.clone()) else {
            return Ok(());
        };
        let capacity = bitfield_capacity(&underlying);
        if bits > capacity {
            return Err(DetailingError::BitfieldOverflow {
                class: def.name.name.to_string(),
                underlying: self.type_name(&underlying),
                bits,
                capacity,
                position: def.position,
            });
        }
        Ok(())
    }

    // ==========================================================================
    // Synthesis
    // ==========================================================================

    /// Make sure the class's default constructor, destructor and copy
    /// constructor exist where the language provides them.
    pub(crate) fn ensure_synthesized(&mut self, item: ItemId) -> Result<()> {
        self.class_signatures(item)?;
        let Some(source) = self.classes.get(&item).copied() else {
            return Ok(());
        };
        if source.progress >= ClassProgress::Synthesizing {
            return Ok(());
        }
        self.set_progress(item, ClassProgress::Synthesizing);
        let result = self.synthesize_members(item, source);
        self.set_progress(item, ClassProgress::Synthesized);
        result
    }

    fn synthesize_members(&mut self, item: ItemId, source: ClassSource<'ast>) -> Result<()> {
        let class = self
            .graph
            .class(item)
            .cloned()
            .ok_or_else(|| DetailingError::internal("class entity missing"))?;
        for &parent in &class.parents {
            self.ensure_synthesized(parent)?;
        }

        let mut needs_cleanup = class.destructor.is_some()
            || class
                .parents
                .iter()
                .any(|&p| self.graph.class(p).is_some_and(|c| c.needs_cleanup));
        for &member in &class.members {
            let Some(ty) = self.graph.variable(member).map(|v| v.ty.clone()) else {
                continue;
            };
            if self.type_needs_cleanup(&ty)? {
                needs_cleanup = true;
            }
        }
        if let Some(entity) = self.graph.class_mut(item) {
            entity.needs_cleanup = needs_cleanup;
        }

        let ClassSource { def, frame, .. } = source;
        let mut synthesized = Vec::new();

        if class.constructors.is_empty() && !class.is_external() {
            self.check_default_constructible_members(item, def)?;
            self.builder.at_position(def.position);
            let body = if class.parents.is_empty() {
                Vec::new()
            } else {
                vec![self.builder.expr_stmt(self.builder.call(self.builder.super_(), &[]))]
            };
            let constructor: &'ast FunctionDefinition<'ast> = self.builder.alloc(self.builder.constructor(&[], &body));
            self.declare_synthesized(frame, constructor, item, class.scope, FunctionFlags::empty())?;
            synthesized.push(constructor);
            debug!(class = %def.name.name, "synthesized default constructor");
        }

        if needs_cleanup && class.destructor.is_none() && !class.is_external() {
            self.builder.at_position(def.position);
            let destructor: &'ast FunctionDefinition<'ast> = self.builder.alloc(self.builder.destructor(&[]));
            self.declare_synthesized(frame, destructor, item, class.scope, FunctionFlags::empty())?;
            synthesized.push(destructor);
            debug!(class = %def.name.name, "synthesized destructor");
        }

        let has_copy = self.graph.class(item).is_some_and(|c| c.copy_constructor.is_some());
        if self.options.synthesize_copy_constructors && !has_copy && !class.is_external() {
            self.builder.at_position(def.position);
            let parameter_ty = self
                .builder
                .ty_reference(self.builder.ty_const(self.builder.ty_self()));
            let parameter = self.builder.param("other", parameter_ty);
            let copy: &'ast FunctionDefinition<'ast> = self.builder.alloc(self.builder.constructor(&[parameter], &[]));
            let function = self.declare_synthesized(frame, copy, item, class.scope, FunctionFlags::COPY_CONSTRUCTOR)?;
            if let Some(entity) = self.graph.class_mut(item) {
                entity.copy_constructor = Some(function);
            }
            synthesized.push(copy);
        }

        self.synthesized.entry(item).or_default().extend(synthesized);
        Ok(())
    }

    fn declare_synthesized(
        &mut self,
        frame: Frame,
        def: &'ast FunctionDefinition<'ast>,
        class: ItemId,
        class_scope: ScopeId,
        extra: FunctionFlags,
    ) -> Result<ItemId> {
        let function = self.declare_function(frame, def, class_scope, Some(class))?;
        if let Some(entity) = self.graph.function_mut(function) {
            entity.flags |= FunctionFlags::SYNTHESIZED | extra;
        }
        Ok(function)
    }

    /// Fail when a default constructor cannot be synthesized: a member
    /// without an initializer is not default constructible, or a parent has
    /// no default constructor.
    fn check_default_constructible_members(&mut self, item: ItemId, def: &ClassDefinition<'_>) -> Result<()> {
        let class_name = def.name.name;
        for field in def.fields() {
            if field.initializer.is_some() {
                continue;
            }
            let Some(member) = self
                .graph
                .class(item)
                .and_then(|c| c.members.iter().copied().find(|&m| self.graph.item(m).name() == field.name.name))
            else {
                continue;
            };
            let Some(ty) = self.graph.variable(member).map(|v| v.ty.clone()) else {
                continue;
            };
            if !self.default_constructible(&ty)? {
                return Err(DetailingError::NoDefaultConstructor {
                    class: class_name.to_string(),
                    reason: format!(
                        "member '{}' of type '{}' has no initializer and no default constructor",
                        field.name.name,
                        self.type_name(&ty)
                    ),
                    position: field.position,
                });
            }
        }

        let parents = self.graph.class(item).map(|c| c.parents.clone()).unwrap_or_default();
        for parent in parents {
            self.ensure_synthesized(parent)?;
            if !self.graph.class(parent).is_some_and(Class::has_default_constructor) {
                return Err(DetailingError::NoDefaultConstructor {
                    class: class_name.to_string(),
                    reason: format!("parent '{}' has no default constructor", self.item_name(parent)),
                    position: def.position,
                });
            }
        }
        Ok(())
    }

    /// Whether a value of `ty` can be created without arguments.
    pub(crate) fn default_constructible(&mut self, ty: &Type) -> Result<bool> {
        if ty.is_reference() {
            return Ok(false);
        }
        if ty.indirection_level() > 0 {
            return Ok(true);
        }
        match ty.kind() {
            TypeKind::Native(native) => Ok(*native != NativeType::Void),
            TypeKind::Any | TypeKind::Function(_) | TypeKind::Optional(_) => Ok(true),
            TypeKind::Union(members) => match members.first() {
                Some(first) => {
                    let first = first.clone();
                    self.default_constructible(&first)
                }
                None => Ok(false),
            },
            TypeKind::Class(class) => {
                let class = *class;
                if self
                    .classes
                    .get(&class)
                    .is_some_and(|s| s.progress == ClassProgress::Synthesizing)
                {
                    return Ok(false);
                }
                self.ensure_synthesized(class)?;
                Ok(self.graph.class(class).is_some_and(Class::has_default_constructor))
            }
        }
    }

    fn type_needs_cleanup(&mut self, ty: &Type) -> Result<bool> {
        if ty.indirection_level() > 0 {
            return Ok(false);
        }
        match ty.kind() {
            TypeKind::Union(_) | TypeKind::Optional(_) => Ok(true),
            TypeKind::Class(class) => {
                let class = *class;
                self.ensure_synthesized(class)?;
                Ok(self.graph.class(class).is_some_and(|c| c.needs_cleanup))
            }
            _ => Ok(false),
        }
    }

    // ==========================================================================
    // Bodies
    // ==========================================================================

    /// Detail field initializers and member bodies, including synthesized
    /// members.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn detail_class_bodies(&mut self, item: ItemId) -> Result<()> {
        self.ensure_synthesized(item)?;
        let Some(source) = self.classes.get(&item).copied() else {
            return Ok(());
        };
        if source.progress >= ClassProgress::Bodies {
            return Ok(());
        }
        self.set_progress(item, ClassProgress::Bodies);
        let ClassSource { def, frame, .. } = source;
        let class_scope = self
            .graph
            .class(item)
            .map(|c| c.scope)
            .ok_or_else(|| DetailingError::internal("class entity missing"))?;

        for field in def.fields() {
            let Some(variable) = self.declared_item(frame, field.id) else {
                continue;
            };
            if field.ty.is_some()
                && let Some(initializer) = field.initializer
            {
                let expected = self.graph.variable(variable).map(|v| v.ty.clone()).unwrap_or_else(Type::any);
                let info = self.detail_expr(frame, initializer, class_scope)?;
                self.check_assignable(frame, initializer, &info.ty, &expected, field.position)?;
            }
            self.store(frame, field.id, DetailHandle::Field { variable }, field.position)?;
            self.apply_attributes(frame, field.attributes, AttributeSubject::Field(variable), field.id, class_scope)?;
        }

        for function in def.functions() {
            let Some(declared) = self.declared_item(frame, function.id) else {
                continue;
            };
            let result = self.detail_function_body(frame, function, declared);
            self.recover(result)?;
        }

        let synthesized_defs = self.synthesized.get(&item).cloned().unwrap_or_default();
        let mut synthesized = Vec::with_capacity(synthesized_defs.len());
        for function in synthesized_defs {
            let Some(declared) = self.declared_item(frame, function.id) else {
                continue;
            };
            let result = self.detail_function_body(frame, function, declared);
            self.recover(result)?;
            synthesized.push(declared);
        }

        if let Some(class) = self.graph.class_mut(item) {
            class.is_detailed = true;
        }
        let handle = ClassHandle {
            class: item,
            synthesized,
            is_template: false,
        };
        self.store(frame, def.id, DetailHandle::Class(handle), def.position)?;
        self.apply_attributes(frame, def.attributes, AttributeSubject::Class(item), def.id, class_scope)?;
        debug!(class = %def.name.name, "detailed class");
        Ok(())
    }

    /// A class statement inside a function body.
    pub(crate) fn detail_local_class(
        &mut self,
        frame: Frame,
        def: &'ast ClassDefinition<'ast>,
        scope: ScopeId,
    ) -> Result<()> {
        let item = self.declare_class(frame, def, scope)?;
        if self.classes.contains_key(&item) {
            self.class_signatures(item)?;
            self.detail_class_bodies(item)?;
        }
        Ok(())
    }
}

fn class_flags(modifiers: ClassModifiers) -> ClassFlags {
    let mut flags = ClassFlags::empty();
    for (modifier, flag) in [
        (ClassModifiers::STRUCTURE, ClassFlags::STRUCTURE),
        (ClassModifiers::EXTERNAL, ClassFlags::EXTERNAL),
        (ClassModifiers::TYPED, ClassFlags::TYPED),
        (ClassModifiers::LITERAL, ClassFlags::LITERAL),
        (ClassModifiers::EXPORT, ClassFlags::EXPORT),
        (ClassModifiers::BITFIELD, ClassFlags::BITFIELD),
    ] {
        if modifiers.contains(modifier) {
            flags |= flag;
        }
    }
    flags
}

/// Bits available in a bitfield's underlying native type.
fn bitfield_capacity(underlying: &Type) -> u32 {
    let qualifiers = underlying.native_qualifiers();
    match underlying.as_native() {
        Some(NativeType::Bool) => 1,
        Some(NativeType::Byte) => 8,
        Some(NativeType::Integer) if qualifiers.contains(Modifier::SHORT) => 16,
        Some(NativeType::Integer) if qualifiers.contains(Modifier::LONG) => 64,
        Some(NativeType::Integer) => 32,
        _ => 0,
    }
}
