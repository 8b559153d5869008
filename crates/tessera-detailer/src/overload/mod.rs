//! Call-site resolution.
//!
//! [`find_compatible_call`] picks the candidate signature that best accepts a
//! list of call arguments. The same routine serves plain calls, constructor
//! selection, `super(...)` calls and operator overloads.
//!
//! ## Algorithm
//!
//! 1. Bind arguments to parameters: named arguments first, then positional
//!    arguments fill the free fixed parameters left to right, and whatever
//!    remains packs into a trailing variadic parameter. A candidate that
//!    cannot bind every fixed parameter is skipped.
//! 2. Score each argument against its parameter with
//!    [`compatibility`](crate::compatibility). An argument may carry several
//!    possible types (an overloaded name not yet narrowed); the best one wins
//!    and the item that produced it is reported for narrowing.
//! 3. A candidate with any zero score is discarded.
//! 4. The survivors are ranked by their per-argument score vectors (see
//!    [`ranking`]).

mod diagnostics;
mod ranking;

pub use diagnostics::{ambiguous_call_error, describe_arguments, describe_candidates, no_matching_call_error};
pub use ranking::{dominates, select_best};

use tracing::trace;

use tessera_core::{FunctionSignature, ItemId, Operator, Orientation, Type};
use tessera_registry::EntityGraph;

use crate::DetailOptions;
use crate::compatibility::CompatibilityCx;

/// One possible type of an argument, with the item it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentOption {
    pub ty: Type,
    /// The function or variable a name lookup produced this type from.
    pub item: Option<ItemId>,
}

/// An argument at a call site.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgument {
    pub name: Option<String>,
    pub options: Vec<ArgumentOption>,
}

impl CallArgument {
    pub fn typed(ty: Type) -> Self {
        Self {
            name: None,
            options: vec![ArgumentOption { ty, item: None }],
        }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::typed(ty)
        }
    }

    /// An argument that is still one of several overloaded items.
    pub fn overloaded(options: Vec<ArgumentOption>) -> Self {
        Self {
            name: None,
            options,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

/// A signature that may accept the call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallCandidate {
    pub item: Option<ItemId>,
    pub signature: FunctionSignature,
}

impl CallCandidate {
    pub fn new(item: Option<ItemId>, signature: FunctionSignature) -> Self {
        Self { item, signature }
    }

    /// The candidate for a function item.
    pub fn function(graph: &EntityGraph, item: ItemId) -> Option<Self> {
        let function = graph.function(item)?;
        Some(Self::new(Some(item), function.signature()))
    }
}

/// Arguments bound to one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterBinding {
    Single(usize),
    /// Arguments packed into a trailing variadic parameter, in call order.
    Variadic(Vec<usize>),
}

/// The chosen candidate and how the call maps onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResolution {
    /// Index into the candidate list.
    pub candidate: usize,
    pub item: Option<ItemId>,
    /// Parameter index of each argument.
    pub argument_map: Vec<usize>,
    /// Arguments bound to each parameter.
    pub bindings: Vec<ParameterBinding>,
    /// Score of each argument against its parameter.
    pub scores: Vec<u32>,
    /// The option each argument was narrowed to.
    pub narrowed: Vec<Option<ItemId>>,
    /// User cast each argument goes through.
    pub casts: Vec<Option<ItemId>>,
}

impl CallResolution {
    /// The arguments bound to parameter `index`.
    pub fn arguments_of(&self, index: usize) -> &[usize] {
        match self.bindings.get(index) {
            Some(ParameterBinding::Single(arg)) => std::slice::from_ref(arg),
            Some(ParameterBinding::Variadic(args)) => args,
            None => &[],
        }
    }
}

/// Why no candidate was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    NoMatch,
    /// Candidate indices that no other candidate beats.
    Ambiguous(Vec<usize>),
}

/// Choose the candidate that best accepts `arguments`.
#[cfg_attr(feature = "profiling", profiling::function)]
#[tracing::instrument(level = "trace", skip_all, fields(arguments = arguments.len(), candidates = candidates.len()))]
pub fn find_compatible_call(
    arguments: &[CallArgument],
    candidates: &[CallCandidate],
    graph: &EntityGraph,
    options: &DetailOptions,
) -> Result<CallResolution, CallFailure> {
    let mut cx = CompatibilityCx::new(graph, options);
    let viable: Vec<CallResolution> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| match_candidate(index, candidate, arguments, &mut cx))
        .collect();

    if viable.is_empty() {
        return Err(CallFailure::NoMatch);
    }

    let variadic: Vec<bool> = viable
        .iter()
        .map(|r| candidates[r.candidate].signature.is_variadic())
        .collect();
    let chosen = select_best(&viable, &variadic, options.ambiguity)
        .map_err(|tied| CallFailure::Ambiguous(tied.iter().map(|&i| viable[i].candidate).collect()))?;
    viable.into_iter().nth(chosen).ok_or(CallFailure::NoMatch)
}

fn match_candidate(
    index: usize,
    candidate: &CallCandidate,
    arguments: &[CallArgument],
    cx: &mut CompatibilityCx<'_>,
) -> Option<CallResolution> {
    let signature = &candidate.signature;
    let bindings = bind_arguments(signature, arguments)?;

    let mut argument_map = vec![0; arguments.len()];
    for (parameter, binding) in bindings.iter().enumerate() {
        match binding {
            ParameterBinding::Single(arg) => argument_map[*arg] = parameter,
            ParameterBinding::Variadic(args) => {
                for &arg in args {
                    argument_map[arg] = parameter;
                }
            }
        }
    }

    let mut scores = Vec::with_capacity(arguments.len());
    let mut narrowed = Vec::with_capacity(arguments.len());
    let mut casts = Vec::with_capacity(arguments.len());
    for (arg, argument) in arguments.iter().enumerate() {
        let parameter = &signature.parameters[argument_map[arg]];
        let mut best: Option<(u32, Option<ItemId>, Option<ItemId>)> = None;
        for option in &argument.options {
            let m = cx.score(&option.ty, &parameter.ty);
            if m.is_compatible() && best.is_none_or(|(score, _, _)| m.score > score) {
                best = Some((m.score, option.item, m.cast));
            }
        }
        let Some((score, item, cast)) = best else {
            trace!(candidate = index, argument = arg, "argument rejected");
            return None;
        };
        scores.push(score);
        narrowed.push(item);
        casts.push(cast);
    }

    trace!(candidate = index, ?scores, "candidate viable");
    Some(CallResolution {
        candidate: index,
        item: candidate.item,
        argument_map,
        bindings,
        scores,
        narrowed,
        casts,
    })
}

/// Bind call arguments to the parameters of `signature`.
///
/// Returns `None` when an argument names no parameter, a parameter is
/// supplied twice, too many arguments are given, or a fixed parameter is
/// left without one.
pub fn bind_arguments(
    signature: &FunctionSignature,
    arguments: &[CallArgument],
) -> Option<Vec<ParameterBinding>> {
    let fixed = signature.fixed_arity();
    let mut slots: Vec<Option<usize>> = vec![None; fixed];
    let mut rest: Vec<usize> = Vec::new();

    for (arg, argument) in arguments.iter().enumerate() {
        let Some(name) = &argument.name else {
            continue;
        };
        let parameter = signature.parameter_index(name)?;
        if parameter >= fixed || slots[parameter].is_some() {
            return None;
        }
        slots[parameter] = Some(arg);
    }

    let mut next = 0;
    for (arg, argument) in arguments.iter().enumerate() {
        if argument.name.is_some() {
            continue;
        }
        while next < fixed && slots[next].is_some() {
            next += 1;
        }
        if next < fixed {
            slots[next] = Some(arg);
        } else if signature.is_variadic() {
            rest.push(arg);
        } else {
            return None;
        }
    }

    let mut bindings: Vec<ParameterBinding> = slots
        .into_iter()
        .map(|slot| slot.map(ParameterBinding::Single))
        .collect::<Option<_>>()?;
    if signature.is_variadic() {
        bindings.push(ParameterBinding::Variadic(rest));
    }
    Some(bindings)
}

/// Operator functions of `class` and its ancestors implementing `operator`.
///
/// Binary operators also match on the side the class occupies. An inherited
/// operator with the same parameters as a nearer one is hidden by it.
pub fn operator_candidates(
    graph: &EntityGraph,
    class: ItemId,
    operator: Operator,
    orientation: Orientation,
) -> Vec<CallCandidate> {
    let mut found: Vec<CallCandidate> = Vec::new();
    for owner in graph.class_and_ancestors(class) {
        let Some(entity) = graph.class(owner) else {
            continue;
        };
        for &item in &entity.operators {
            let Some(function) = graph.function(item) else {
                continue;
            };
            if function.operator != Some(operator) {
                continue;
            }
            if matches!(operator, Operator::Binary(_)) && function.orientation != orientation {
                continue;
            }
            let signature = function.signature();
            if found
                .iter()
                .any(|c| c.signature.parameters == signature.parameters)
            {
                continue;
            }
            found.push(CallCandidate::new(Some(item), signature));
        }
    }
    found
}

/// Resolve an operator applied to a value of `class`.
///
/// `arguments` are the operands other than the class value itself.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn find_operator(
    class: ItemId,
    operator: Operator,
    orientation: Orientation,
    arguments: &[CallArgument],
    graph: &EntityGraph,
    options: &DetailOptions,
) -> Result<CallResolution, CallFailure> {
    let candidates = operator_candidates(graph, class, operator, orientation);
    if candidates.is_empty() {
        return Err(CallFailure::NoMatch);
    }
    let mut resolution = find_compatible_call(arguments, &candidates, graph, options)?;
    resolution.item = candidates[resolution.candidate].item;
    Ok(resolution)
}
