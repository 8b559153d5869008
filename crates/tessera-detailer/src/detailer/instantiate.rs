//! Generic instantiation.
//!
//! An instance is detailed from the template's own tree in a fresh frame,
//! with each generic parameter bound as a private type item in the
//! instance's scope. Instances are memoised per template and argument list;
//! the cache entry is written before members are detailed so recursive
//! references (`Node<T>*` inside `Node<T>`) find the instance in progress.

use tracing::debug;

use tessera_core::{
    DetailingError, ItemHeader, ItemId, ItemKind, ModuleId, Position, ScopeId, Type, TypeItem,
    Visibility,
};
use tessera_syntax::Ident;

use super::{Detailer, Frame, Result, Template};
use crate::generics::GenericInstance;

impl<'ast> Detailer<'ast> {
    /// Instantiate a generic class with concrete type arguments.
    #[tracing::instrument(level = "debug", skip(self, arguments), fields(arguments = arguments.len()))]
    pub fn instantiate_generic_class(
        &mut self,
        template: ItemId,
        arguments: Vec<Type>,
        position: Position,
    ) -> Result<ItemId> {
        let Some(Template::Class { def, scope, module }) = self.templates.get(&template).copied() else {
            return Err(DetailingError::other(
                position,
                format!("'{}' is not a generic class", self.item_name(template)),
            ));
        };
        self.check_generic_arity(def.name.name, def.generics, &arguments, position)?;
        if let Some(instance) = self.instances.get_class_instance(template, &arguments) {
            debug!(template = %def.name.name, "generic instance cache hit");
            return Ok(instance.item);
        }

        let frame = self.open_frame(module);
        let name = self.instance_name(def.name.name, &arguments);
        let item = self.create_class_entity(frame, def, scope, &name);
        let class_scope = match self.graph.class_mut(item) {
            Some(class) => {
                class.generic_arguments = arguments.clone();
                class.generic_origin = Some(template);
                class.scope
            }
            None => return Err(DetailingError::internal("instance is not a class")),
        };
        self.bind_generic_parameters(frame, def.generics, &arguments, class_scope);

        self.instances.cache_class_instance(
            template,
            GenericInstance {
                arguments,
                item,
                frame: frame.id,
            },
        );
        self.instance_frames.entry(def.id).or_default().push(frame.id);
        self.record_declared(frame, def.id, item);
        self.note_generic_dependency(module);
        debug!(%name, %item, frame = %frame.id, "instantiated generic class");

        self.class_signatures(item)?;
        self.pending_classes.push(item);
        Ok(item)
    }

    /// Instantiate a generic function with concrete type arguments.
    #[tracing::instrument(level = "debug", skip(self, arguments), fields(arguments = arguments.len()))]
    pub fn instantiate_generic_function(
        &mut self,
        template: ItemId,
        arguments: Vec<Type>,
        position: Position,
    ) -> Result<ItemId> {
        let Some(Template::Function {
            def,
            scope,
            module,
            class,
        }) = self.templates.get(&template).copied()
        else {
            return Err(DetailingError::other(
                position,
                format!("'{}' is not a generic function", self.item_name(template)),
            ));
        };
        self.check_generic_arity(def.name.name, def.generics, &arguments, position)?;
        if let Some(instance) = self.instances.get_function_instance(template, &arguments) {
            debug!(template = %def.name.name, "generic instance cache hit");
            return Ok(instance.item);
        }

        let frame = self.open_frame(module);
        let name = self.instance_name(def.name.name, &arguments);
        let item = self.create_function_entity(frame, def, scope, &name, class, 0);
        let function_scope = match self.graph.function_mut(item) {
            Some(function) => {
                function.generic_arguments = arguments.clone();
                function.generic_origin = Some(template);
                function.scope
            }
            None => return Err(DetailingError::internal("instance is not a function")),
        };
        self.bind_generic_parameters(frame, def.generics, &arguments, function_scope);

        self.instances.cache_function_instance(
            template,
            GenericInstance {
                arguments,
                item,
                frame: frame.id,
            },
        );
        self.instance_frames.entry(def.id).or_default().push(frame.id);
        self.record_declared(frame, def.id, item);
        self.note_generic_dependency(module);

        self.resolve_signature(frame, def, item, class)?;
        self.declare_optional_variants(def, item, None)?;
        self.pending_functions.push((frame, def, item));
        debug!(%name, %item, frame = %frame.id, "instantiated generic function");
        Ok(item)
    }

    fn check_generic_arity(
        &self,
        name: &str,
        generics: &[Ident<'_>],
        arguments: &[Type],
        position: Position,
    ) -> Result<()> {
        if generics.len() == arguments.len() {
            Ok(())
        } else {
            Err(DetailingError::GenericArity {
                name: name.to_string(),
                expected: generics.len(),
                got: arguments.len(),
                position,
            })
        }
    }

    fn instance_name(&self, base: &str, arguments: &[Type]) -> String {
        let rendered: Vec<String> = arguments.iter().map(|ty| self.type_name(ty)).collect();
        format!("{base}<{}>", rendered.join(", "))
    }

    fn bind_generic_parameters(&mut self, frame: Frame, generics: &[Ident<'_>], arguments: &[Type], scope: ScopeId) {
        for (parameter, argument) in generics.iter().zip(arguments) {
            let header = ItemHeader::new(parameter.name, scope, frame.module)
                .with_visibility(Visibility::Private)
                .with_position(parameter.position);
            self.graph
                .add_item(header, ItemKind::Type(TypeItem::new(argument.clone())));
        }
    }

    /// Record that the module being detailed instantiated a generic
    /// declared in `origin`.
    fn note_generic_dependency(&mut self, origin: ModuleId) {
        let Some(current) = self.current_module() else {
            return;
        };
        if current == origin {
            return;
        }
        let module = self.graph.module_mut(current);
        if !module.generic_dependencies.contains(&origin) {
            module.generic_dependencies.push(origin);
        }
    }
}
