//! Generic instantiation cache and argument inference.
//!
//! Instances are memoised per template and exact argument list, so asking for
//! `Box<int>` twice yields the same item. Lookups bucket by a combined xxh64
//! digest of the argument fingerprints and then compare the arguments exactly;
//! structurally equal types always share an instance.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use xxhash_rust::xxh64::xxh64;

use tessera_core::{ItemId, Type};

use crate::handles::FrameId;

/// One instantiation of a generic class or function.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericInstance {
    pub arguments: Vec<Type>,
    pub item: ItemId,
    /// The frame the instance's body handles are stored under.
    pub frame: FrameId,
}

type Bucket = SmallVec<[GenericInstance; 1]>;

/// Cache of generic class and function instances.
#[derive(Debug, Default)]
pub struct InstanceCache {
    classes: FxHashMap<(ItemId, u64), Bucket>,
    functions: FxHashMap<(ItemId, u64), Bucket>,
    class_count: usize,
    function_count: usize,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of an argument list, independent of where the types came from.
    pub fn arguments_key(arguments: &[Type]) -> u64 {
        let mut bytes = Vec::with_capacity(arguments.len() * 8);
        for argument in arguments {
            bytes.extend_from_slice(&argument.fingerprint().to_le_bytes());
        }
        xxh64(&bytes, arguments.len() as u64)
    }

    pub fn get_class_instance(&self, template: ItemId, arguments: &[Type]) -> Option<&GenericInstance> {
        find(&self.classes, template, arguments)
    }

    pub fn get_function_instance(&self, template: ItemId, arguments: &[Type]) -> Option<&GenericInstance> {
        find(&self.functions, template, arguments)
    }

    pub fn has_class_instance(&self, template: ItemId, arguments: &[Type]) -> bool {
        self.get_class_instance(template, arguments).is_some()
    }

    /// Record a class instance. Returns false, leaving the cache unchanged,
    /// when the same arguments are already cached.
    pub fn cache_class_instance(&mut self, template: ItemId, instance: GenericInstance) -> bool {
        let added = insert(&mut self.classes, template, instance);
        self.class_count += usize::from(added);
        added
    }

    pub fn cache_function_instance(&mut self, template: ItemId, instance: GenericInstance) -> bool {
        let added = insert(&mut self.functions, template, instance);
        self.function_count += usize::from(added);
        added
    }

    /// Every cached instance of a template, classes and functions alike.
    pub fn instances_of(&self, template: ItemId) -> impl Iterator<Item = &GenericInstance> {
        self.classes
            .iter()
            .chain(self.functions.iter())
            .filter(move |((owner, _), _)| *owner == template)
            .flat_map(|(_, bucket)| bucket.iter())
    }

    pub fn class_instance_count(&self) -> usize {
        self.class_count
    }

    pub fn function_instance_count(&self) -> usize {
        self.function_count
    }

    pub fn clear(&mut self) {
        self.classes.clear();
        self.functions.clear();
        self.class_count = 0;
        self.function_count = 0;
    }
}

fn find<'a>(
    map: &'a FxHashMap<(ItemId, u64), Bucket>,
    template: ItemId,
    arguments: &[Type],
) -> Option<&'a GenericInstance> {
    map.get(&(template, InstanceCache::arguments_key(arguments)))?
        .iter()
        .find(|instance| instance.arguments == arguments)
}

fn insert(map: &mut FxHashMap<(ItemId, u64), Bucket>, template: ItemId, instance: GenericInstance) -> bool {
    let bucket = map
        .entry((template, InstanceCache::arguments_key(&instance.arguments)))
        .or_default();
    if bucket.iter().any(|cached| cached.arguments == instance.arguments) {
        return false;
    }
    bucket.push(instance);
    true
}

/// Infer generic arguments from a call.
///
/// `bound` pairs, for each argument, the written type name of the parameter
/// it binds to (when that type is a single bare name) with the argument's
/// type. Each generic parameter takes the type of the first argument whose
/// parameter is written exactly as that generic's name. On failure the index
/// of the first generic that no argument determines is returned.
pub fn infer_generic_arguments(generics: &[&str], bound: &[(Option<&str>, Type)]) -> Result<Vec<Type>, usize> {
    generics
        .iter()
        .enumerate()
        .map(|(index, generic)| {
            bound
                .iter()
                .find(|(written, _)| *written == Some(*generic))
                .map(|(_, ty)| inferred_type(ty))
                .ok_or(index)
        })
        .collect()
}

/// The type inferred from a value of type `ty`, for generic arguments and
/// untyped variables: references are read through and a by-value `const`
/// is dropped.
pub fn inferred_type(ty: &Type) -> Type {
    let value = ty.without_outer_references();
    if value.indirection_level() == 0 {
        value.deconstify()
    } else {
        value
    }
}
