use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_until, take_while1},
    character::complete::{char, one_of},
    combinator::{eof, map},
    error::ErrorKind,
    multi::many0,
    sequence::delimited,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor(pub(crate) FieldType);

impl FieldDescriptor {
    pub fn field_type(&self) -> &FieldType {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub(crate) parameters: Vec<FieldType>,
    pub(crate) return_type: ReturnType,
}

impl MethodDescriptor {
    pub fn parameters(&self) -> &[FieldType] {
        &self.parameters
    }

    pub fn return_type(&self) -> Option<&FieldType> {
        self.return_type.as_ref()
    }
}

pub type ReturnType = Option<FieldType>;

/// Source-level names of the primitive types. None of them can be aliased.
pub const PRIMITIVE_NAMES: [&str; 8] = [
    "boolean", "byte", "char", "double", "float", "int", "long", "short",
];

pub fn is_primitive_name(name: &str) -> bool {
    PRIMITIVE_NAMES.contains(&name)
}

/// `java/util/Map$Entry` -> `java.util.Map$Entry`
pub fn internal_to_qualified(name: &str) -> String {
    name.replace('/', ".")
}

/// `java.util.Map$Entry` -> `Map$Entry`
pub fn simple_name(qualified: &str) -> &str {
    qualified
        .rsplit_once('.')
        .map(|(_, simple)| simple)
        .unwrap_or(qualified)
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Object(String),
    Short,
    Boolean,
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn is_long(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// Number of local variable slots a value of this type occupies.
    pub fn slot_size(&self) -> u16 {
        if self.is_long() { 2 } else { 1 }
    }

    /// Source-level spelling, e.g. `int`, `java.lang.String`, `byte[][]`.
    pub fn java_name(&self) -> String {
        self.render(true)
    }

    /// Like [`FieldType::java_name`] but without the package, e.g. `String[]`.
    pub fn simple_java_name(&self) -> String {
        self.render(false)
    }

    fn render(&self, qualified: bool) -> String {
        match self {
            FieldType::Byte => "byte".to_string(),
            FieldType::Char => "char".to_string(),
            FieldType::Double => "double".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Int => "int".to_string(),
            FieldType::Long => "long".to_string(),
            FieldType::Short => "short".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Object(name) => {
                let name = internal_to_qualified(name);
                if qualified {
                    name
                } else {
                    simple_name(&name).to_string()
                }
            }
            FieldType::Array(element) => element.render(qualified) + "[]",
        }
    }
}

pub fn parse_field_descriptor(input: &str) -> IResult<&str, FieldDescriptor> {
    let (input, field_type) = parse_field_type(input)?;
    eof(input)?;
    Ok((input, FieldDescriptor(field_type)))
}

pub fn parse_method_descriptor(input: &str) -> IResult<&str, MethodDescriptor> {
    let (input, parameters) =
        delimited(char('('), many0(parse_field_type), char(')')).parse(input)?;

    let (input, return_type) = parse_return_type_descriptor(input)?;

    eof(input)?;
    Ok((
        input,
        MethodDescriptor {
            parameters,
            return_type,
        },
    ))
}

pub fn parse_return_type_descriptor(input: &str) -> IResult<&str, ReturnType> {
    alt((map(parse_field_type, Some), parse_void_type)).parse(input)
}

fn parse_field_type(input: &str) -> IResult<&str, FieldType> {
    alt((parse_base_type, parse_object_type, parse_array_type)).parse(input)
}

fn parse_base_type(input: &str) -> IResult<&str, FieldType> {
    let (input, ch) = one_of("BCDFIJSZ")(input)?;
    let field_type = match ch {
        'B' => FieldType::Byte,
        'C' => FieldType::Char,
        'D' => FieldType::Double,
        'F' => FieldType::Float,
        'I' => FieldType::Int,
        'J' => FieldType::Long,
        'S' => FieldType::Short,
        'Z' => FieldType::Boolean,
        _ => unreachable!("one_of only yields base type characters"),
    };
    Ok((input, field_type))
}

fn parse_object_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('L')(input)?;

    let (input, class_name) = take_until(";")(input)?;

    let (input, _) = char(';')(input)?;

    Ok((input, FieldType::Object(class_name.to_string())))
}

/// The JVM rejects array types with more dimensions than this.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

fn parse_array_type(input: &str) -> IResult<&str, FieldType> {
    let (rest, dimensions) = take_while1(|c: char| c == '[').parse(input)?;
    if dimensions.len() > MAX_ARRAY_DIMENSIONS {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }

    let (rest, element) = alt((parse_base_type, parse_object_type)).parse(rest)?;
    let field_type = (0..dimensions.len())
        .fold(element, |inner, _| FieldType::Array(Box::new(inner)));

    Ok((rest, field_type))
}

fn parse_void_type(input: &str) -> IResult<&str, Option<FieldType>> {
    let (input, _) = char('V')(input)?;
    Ok((input, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn method_descriptor_parameters_and_return() {
        let (_, descriptor) = parse_method_descriptor("(I[Ljava/lang/String;J)V").unwrap();
        assert_eq!(
            descriptor.parameters,
            vec![
                FieldType::Int,
                FieldType::Array(Box::new(FieldType::Object("java/lang/String".into()))),
                FieldType::Long,
            ]
        );
        assert_eq!(descriptor.return_type, None);
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_field_descriptor("IX").is_err());
        assert!(parse_method_descriptor("(I)").is_err());
    }

    #[test]
    fn array_dimensions_are_capped() {
        let at_limit = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS));
        let (_, descriptor) = parse_field_descriptor(&at_limit).unwrap();
        let mut ty = descriptor.field_type();
        let mut dimensions = 0;
        while let FieldType::Array(inner) = ty {
            ty = inner.as_ref();
            dimensions += 1;
        }
        assert_eq!(dimensions, MAX_ARRAY_DIMENSIONS);
        assert_eq!(*ty, FieldType::Int);

        let over = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS + 1));
        assert!(parse_field_descriptor(&over).is_err());
        assert!(parse_method_descriptor(&format!("({over})V")).is_err());
        assert!(parse_field_descriptor("[").is_err());
    }

    #[test]
    fn java_names() {
        let (_, FieldDescriptor(ty)) = parse_field_descriptor("[[Ljava/util/Map$Entry;").unwrap();
        assert_eq!(ty.java_name(), "java.util.Map$Entry[][]");
        assert_eq!(ty.simple_java_name(), "Map$Entry[][]");
        assert_eq!(FieldType::Boolean.java_name(), "boolean");
    }

    #[test]
    fn wide_types_take_two_slots() {
        assert_eq!(FieldType::Double.slot_size(), 2);
        assert_eq!(FieldType::Object("a/B".into()).slot_size(), 1);
    }
}
