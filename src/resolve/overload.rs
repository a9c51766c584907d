use std::{borrow::Cow, collections::HashSet, sync::Arc};

use log::trace;

use crate::{
    class::MethodInfo,
    descriptor::is_primitive_name,
    library::LibraryIndex,
    resolve::types::{BOOLEAN, DATE, NUMBER, OBJECT, STRING, TypeRegistry, UNDEFINED_NAMES},
};

/// Score of an argument or candidate that cannot be converted at all.
pub const NO_MATCH: u32 = 999;

/// Coarse kind of an argument as the dynamic caller sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Undefined,
    Boolean,
    Numeric,
    Textual,
    Array,
    Object,
}

/// Direct supertypes of classes, used for assignability checks.
pub trait TypeHierarchy {
    /// Superclass first, then interfaces. Empty when the class is unknown.
    fn supertypes(&self, qualified: &str) -> Vec<Arc<str>>;
}

/// Knows only the handful of platform types the scoring rules name.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinHierarchy;

impl TypeHierarchy for BuiltinHierarchy {
    fn supertypes(&self, _: &str) -> Vec<Arc<str>> {
        vec![]
    }
}

impl TypeHierarchy for LibraryIndex {
    fn supertypes(&self, qualified: &str) -> Vec<Arc<str>> {
        let Some(class) = self.lookup(qualified) else {
            return vec![];
        };
        class
            .super_class()
            .into_iter()
            .chain(class.interfaces())
            .cloned()
            .collect()
    }
}

fn builtin_supertypes(qualified: &str) -> &'static [&'static str] {
    match qualified {
        "java.lang.Byte" | "java.lang.Short" | "java.lang.Integer" | "java.lang.Long"
        | "java.lang.Float" | "java.lang.Double" | "java.math.BigInteger"
        | "java.math.BigDecimal" => &[NUMBER],
        STRING => &["java.lang.CharSequence", "java.lang.Comparable", "java.io.Serializable"],
        NUMBER | BOOLEAN | DATE => &["java.io.Serializable"],
        _ => &[],
    }
}

fn supertypes_of(hierarchy: &dyn TypeHierarchy, qualified: &str) -> Vec<Arc<str>> {
    let known = hierarchy.supertypes(qualified);
    if !known.is_empty() {
        return known;
    }
    builtin_supertypes(qualified)
        .iter()
        .map(|name| Arc::from(*name))
        .collect()
}

/// Whether a value of type `from` can be assigned to `to` without conversion. Arrays follow
/// the platform rules; primitives are only assignable to themselves.
pub fn is_assignable(hierarchy: &dyn TypeHierarchy, from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    if is_primitive_name(from) || is_primitive_name(to) {
        return false;
    }
    match (from.strip_suffix("[]"), to.strip_suffix("[]")) {
        (Some(from_element), Some(to_element)) => {
            if is_primitive_name(from_element) || is_primitive_name(to_element) {
                return from_element == to_element;
            }
            is_assignable(hierarchy, from_element, to_element)
        }
        (Some(_), None) => {
            matches!(to, OBJECT | "java.lang.Cloneable" | "java.io.Serializable")
        }
        (None, Some(_)) => false,
        (None, None) => {
            if to == OBJECT {
                return true;
            }
            let mut visited = HashSet::new();
            let mut pending = vec![Arc::<str>::from(from)];
            while let Some(current) = pending.pop() {
                if !visited.insert(Arc::clone(&current)) {
                    continue;
                }
                for supertype in supertypes_of(hierarchy, &current) {
                    if &*supertype == to {
                        return true;
                    }
                    pending.push(supertype);
                }
            }
            false
        }
    }
}

/// Widening preference of a primitive formal, `double` first.
fn size_rank(formal: &str) -> u32 {
    match formal {
        "double" => 1,
        "float" => 2,
        "long" => 3,
        "int" => 4,
        "short" => 5,
        "char" => 6,
        "byte" => 7,
        "boolean" => NO_MATCH,
        _ => 8,
    }
}

/// Scores argument types against formal parameter types. Lower is better.
pub struct Scorer<'a> {
    registry: &'a TypeRegistry,
    hierarchy: &'a dyn TypeHierarchy,
}

impl<'a> Scorer<'a> {
    pub fn new(registry: &'a TypeRegistry, hierarchy: &'a dyn TypeHierarchy) -> Self {
        Self {
            registry,
            hierarchy,
        }
    }

    /// Classifies an argument type as the caller wrote it.
    pub fn classify(&self, actual: &str) -> ArgKind {
        if UNDEFINED_NAMES.contains(&actual) {
            return ArgKind::Undefined;
        }
        let actual = self.registry.normalize(actual);
        match &*actual {
            "boolean" | BOOLEAN => ArgKind::Boolean,
            STRING => ArgKind::Textual,
            "char" => ArgKind::Object,
            name if is_primitive_name(name) => ArgKind::Numeric,
            name if name.ends_with("[]") => ArgKind::Array,
            name if is_assignable(self.hierarchy, name, NUMBER) => ArgKind::Numeric,
            _ => ArgKind::Object,
        }
    }

    /// Conversion score of passing an `actual` argument to a `formal` parameter.
    pub fn score_parameter(&self, actual: &str, formal: &str) -> u32 {
        if actual == formal {
            return 0;
        }
        let kind = self.classify(actual);
        let from = self.registry.normalize(actual);
        let to = self.registry.normalize(formal);
        if kind != ArgKind::Undefined && from == to {
            return 0;
        }
        let (from, to) = (&*from, &*to);
        let to_primitive = is_primitive_name(to);

        let score = match kind {
            ArgKind::Undefined => match to {
                STRING | OBJECT => Some(1),
                _ => None,
            },
            ArgKind::Boolean => match to {
                "boolean" => Some(1),
                BOOLEAN => Some(2),
                OBJECT => Some(3),
                STRING => Some(4),
                _ => None,
            },
            ArgKind::Numeric => match to {
                "double" => Some(1),
                "boolean" => None,
                _ if to_primitive => Some(1 + size_rank(to)),
                STRING => Some(9),
                OBJECT => Some(10),
                _ if is_assignable(self.hierarchy, to, NUMBER) => Some(2),
                _ => None,
            },
            ArgKind::Textual => match to {
                STRING => Some(1),
                "char" => Some(3),
                "boolean" => None,
                _ if to_primitive => Some(4),
                _ => None,
            },
            ArgKind::Array => match to {
                _ if to.ends_with("[]") => Some(1),
                STRING => Some(2),
                "boolean" => None,
                _ if to_primitive => Some(2 + size_rank(to)),
                _ => None,
            },
            ArgKind::Object => {
                if to != OBJECT && is_assignable(self.hierarchy, from, to) {
                    Some(1)
                } else if to.ends_with("[]") {
                    from.ends_with("[]").then_some(1)
                } else {
                    match to {
                        OBJECT => Some(2),
                        STRING => Some(3),
                        DATE => (from == DATE).then_some(1),
                        "boolean" => None,
                        _ if to_primitive => Some(3 + size_rank(to)),
                        _ => None,
                    }
                }
            }
        };
        if let Some(score) = score {
            return score;
        }

        if is_assignable(self.hierarchy, from, to) {
            3
        } else if to == OBJECT {
            4
        } else {
            NO_MATCH
        }
    }

    /// Sum of the parameter scores, or [`NO_MATCH`] as soon as any parameter cannot match.
    pub fn score<C: Candidate + ?Sized>(&self, candidate: &C, name: &str, arguments: &[String]) -> u32 {
        if candidate.name() != name || candidate.parameter_count() != arguments.len() {
            return NO_MATCH;
        }
        let mut total = 0;
        for (index, actual) in arguments.iter().enumerate() {
            let score = self.score_parameter(actual, &candidate.parameter_type(index));
            if score >= NO_MATCH {
                return NO_MATCH;
            }
            total += score;
        }
        total
    }

    /// The lowest scoring candidate. Among equal scores the earliest candidate wins.
    pub fn best<'c, C, I>(&self, candidates: I, name: &str, arguments: &[String]) -> Overload<'c, C>
    where
        C: Candidate + ?Sized + 'c,
        I: IntoIterator<Item = &'c C>,
    {
        let mut best = Overload::NoMatch;
        let mut best_score = NO_MATCH;
        for candidate in candidates {
            let score = self.score(candidate, name, arguments);
            trace!("{name}({}) scores {score}", arguments.join(", "));
            if score < best_score {
                best_score = score;
                best = Overload::Match { candidate, score };
            }
        }
        best
    }
}

/// Anything a call can be resolved against: a declared method, a completion record, a
/// keyword function.
pub trait Candidate {
    fn name(&self) -> &str;

    fn parameter_count(&self) -> usize;

    /// Platform spelling of a parameter type, e.g. `int` or `java.lang.String[]`.
    fn parameter_type(&self, index: usize) -> Cow<'_, str>;
}

impl Candidate for MethodInfo {
    fn name(&self) -> &str {
        MethodInfo::name(self)
    }

    fn parameter_count(&self) -> usize {
        MethodInfo::parameter_count(self)
    }

    fn parameter_type(&self, index: usize) -> Cow<'_, str> {
        Cow::Owned(self.descriptor().parameters()[index].java_name())
    }
}

#[derive(Debug)]
pub enum Overload<'c, C: ?Sized> {
    Match { candidate: &'c C, score: u32 },
    NoMatch,
}

impl<'c, C: ?Sized> Overload<'c, C> {
    pub fn candidate(&self) -> Option<&'c C> {
        match self {
            Overload::Match { candidate, .. } => Some(*candidate),
            Overload::NoMatch => None,
        }
    }
}

/// Best candidate for calling `name` with arguments of the given types, or
/// [`Overload::NoMatch`] when no candidate converts.
pub fn best_overload<'c, C, I>(
    registry: &TypeRegistry,
    hierarchy: &dyn TypeHierarchy,
    candidates: I,
    name: &str,
    arguments: &[String],
) -> Overload<'c, C>
where
    C: Candidate + ?Sized + 'c,
    I: IntoIterator<Item = &'c C>,
{
    Scorer::new(registry, hierarchy).best(candidates, name, arguments)
}
