//! Messages for failed call resolution.
//!
//! The shape is fixed: arguments render as their possible types joined by
//! `" | "`, and candidates render one signature per line, or `**none**` when
//! nothing was visible.

use tessera_core::{DetailingError, Position};
use tessera_registry::EntityGraph;

use super::{CallArgument, CallCandidate};

/// Comma separated argument list; an argument with several possible types
/// lists them joined by `" | "`.
pub fn describe_arguments(arguments: &[CallArgument], graph: &EntityGraph) -> String {
    arguments
        .iter()
        .map(|argument| {
            let types: Vec<String> = argument
                .options
                .iter()
                .map(|option| graph.type_name(&option.ty))
                .collect();
            match &argument.name {
                Some(name) => format!("{name}: {}", types.join(" | ")),
                None => types.join(" | "),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One signature per line, or `**none**`.
pub fn describe_candidates(candidates: &[CallCandidate], graph: &EntityGraph) -> String {
    if candidates.is_empty() {
        return "**none**".to_string();
    }
    candidates
        .iter()
        .map(|candidate| graph.signature_text(&candidate.signature))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn no_matching_call_error(
    name: &str,
    arguments: &[CallArgument],
    candidates: &[CallCandidate],
    graph: &EntityGraph,
    position: Position,
) -> DetailingError {
    DetailingError::NoMatchingCall {
        name: name.to_string(),
        arguments: describe_arguments(arguments, graph),
        candidates: describe_candidates(candidates, graph),
        position,
    }
}

/// `tied` indexes into `candidates`.
pub fn ambiguous_call_error(
    name: &str,
    arguments: &[CallArgument],
    candidates: &[CallCandidate],
    tied: &[usize],
    graph: &EntityGraph,
    position: Position,
) -> DetailingError {
    let tied: Vec<CallCandidate> = tied
        .iter()
        .filter_map(|&i| candidates.get(i).cloned())
        .collect();
    DetailingError::AmbiguousCall {
        name: name.to_string(),
        arguments: describe_arguments(arguments, graph),
        candidates: describe_candidates(&tied, graph),
        position,
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::{FunctionSignature, NativeType, SignatureParameter, Type};

    use super::*;
    use crate::overload::ArgumentOption;

    #[test]
    fn no_candidates_render_as_none() {
        let graph = EntityGraph::new();
        let error = no_matching_call_error(
            "foo",
            &[CallArgument::typed(Type::int())],
            &[],
            &graph,
            Position::new(2, 5),
        );
        let DetailingError::NoMatchingCall {
            arguments,
            candidates,
            ..
        } = &error
        else {
            panic!("unexpected error {error:?}");
        };
        assert_eq!(arguments, "int");
        assert_eq!(candidates, "**none**");
        assert!(error.to_string().starts_with("at 2:5:"));
    }

    #[test]
    fn overloaded_arguments_join_with_bar() {
        let graph = EntityGraph::new();
        let argument = CallArgument::overloaded(vec![
            ArgumentOption {
                ty: Type::int(),
                item: None,
            },
            ArgumentOption {
                ty: Type::native(NativeType::Double),
                item: None,
            },
        ]);
        assert_eq!(describe_arguments(&[argument], &graph), "int | double");
        assert_eq!(
            describe_arguments(&[CallArgument::named("b", Type::bool())], &graph),
            "b: bool"
        );
    }

    #[test]
    fn candidates_one_per_line() {
        let graph = EntityGraph::new();
        let candidates = [
            CallCandidate::new(
                None,
                FunctionSignature::new(
                    vec![SignatureParameter::new("a", Type::int())],
                    Type::int(),
                ),
            ),
            CallCandidate::new(None, FunctionSignature::new(Vec::new(), Type::void())),
        ];
        let text = describe_candidates(&candidates, &graph);
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text.lines().next(), Some("(a: int) => int"));
    }
}
