use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, opt, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

use crate::error::SignatureError;

/// A declared member signature such as `max(int a, int b)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSignature {
    pub name: String,
    pub parameters: Vec<DeclaredParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredParameter {
    pub type_name: String,
    pub name: Option<String>,
}

/// A call to resolve: the callee name and the type of each argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub name: String,
    pub arguments: Vec<String>,
}

impl CallSite {
    pub fn new<S: Into<String>>(name: impl Into<String>, arguments: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parses `name(Type a, Type b)`; parameter names are optional and generic arguments are
/// dropped (`List<String> xs` has type `List`). A trailing `...` reads as `[]`.
pub fn parse_signature(input: &str) -> Result<DeclaredSignature, SignatureError> {
    match signature(input) {
        Ok((_, signature)) => Ok(signature),
        Err(_) => Err(SignatureError(input.to_string())),
    }
}

/// Parses a call site written as `name(Type, Type)`. Names after the types are ignored.
pub fn parse_call_site(input: &str) -> Result<CallSite, SignatureError> {
    let signature = parse_signature(input)?;
    Ok(CallSite {
        name: signature.name,
        arguments: signature
            .parameters
            .into_iter()
            .map(|parameter| parameter.type_name)
            .collect(),
    })
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(is_identifier_char)(input)
}

fn dotted_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(identifier, many0(pair(char('.'), identifier)))).parse(input)
}

/// Skips a balanced `<...>` group.
fn generic_arguments(input: &str) -> IResult<&str, ()> {
    let (mut rest, _) = char('<')(input)?;
    let mut depth = 1usize;
    while depth > 0 {
        let mut chars = rest.chars();
        let Some(c) = chars.next() else {
            return Err(nom::Err::Error(nom::error::Error::new(
                rest,
                nom::error::ErrorKind::Eof,
            )));
        };
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            _ => {}
        }
        rest = chars.as_str();
    }
    Ok((rest, ()))
}

fn type_name(input: &str) -> IResult<&str, String> {
    let (input, base) = dotted_name(input)?;
    let (input, _) = opt(preceded(multispace0, generic_arguments)).parse(input)?;
    let (input, dimensions) =
        many0(preceded(multispace0, pair(char('['), preceded(multispace0, char(']'))))).parse(input)?;
    let (input, varargs) = opt(preceded(multispace0, tag("..."))).parse(input)?;

    let mut type_name = base.to_string();
    for _ in 0..dimensions.len() + usize::from(varargs.is_some()) {
        type_name.push_str("[]");
    }
    Ok((input, type_name))
}

fn parameter(input: &str) -> IResult<&str, DeclaredParameter> {
    let (input, type_name) = type_name(input)?;
    let (input, name) = opt(preceded(multispace1, identifier)).parse(input)?;
    Ok((
        input,
        DeclaredParameter {
            type_name,
            name: name.map(str::to_string),
        },
    ))
}

fn signature(input: &str) -> IResult<&str, DeclaredSignature> {
    let (input, name) = preceded(multispace0, dotted_name).parse(input)?;
    let (input, parameters) = delimited(
        preceded(multispace0, char('(')),
        separated_list0(
            char(','),
            delimited(multispace0, parameter, multispace0),
        ),
        terminated(preceded(multispace0, char(')')), multispace0),
    )
    .parse(input)?;
    eof(input)?;
    Ok((
        input,
        DeclaredSignature {
            name: name.to_string(),
            parameters,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn named_parameters() {
        let signature = parse_signature("max(int a, double b)").unwrap();
        assert_eq!(signature.name, "max");
        assert_eq!(
            signature.parameters,
            vec![
                DeclaredParameter {
                    type_name: "int".into(),
                    name: Some("a".into()),
                },
                DeclaredParameter {
                    type_name: "double".into(),
                    name: Some("b".into()),
                },
            ]
        );
    }

    #[test]
    fn call_sites() {
        assert_eq!(
            parse_call_site("f(Number, String)").unwrap(),
            CallSite::new("f", ["Number", "String"])
        );
        assert_eq!(
            parse_call_site("  print ( )  ").unwrap(),
            CallSite::new("print", Vec::<String>::new())
        );
    }

    #[test]
    fn arrays_generics_and_varargs() {
        let signature =
            parse_signature("put(java.util.Map<String, List<Integer>> m, byte [] data, Object... rest)")
                .unwrap();
        let types: Vec<_> = signature
            .parameters
            .iter()
            .map(|parameter| parameter.type_name.as_str())
            .collect();
        assert_eq!(types, vec!["java.util.Map", "byte[]", "Object[]"]);
    }

    #[test]
    fn malformed() {
        assert!(parse_signature("f(int").is_err());
        assert!(parse_signature("(int)").is_err());
        assert!(parse_signature("f(int,)").is_err());
        assert!(parse_signature("f(int) trailing").is_err());
    }
}
