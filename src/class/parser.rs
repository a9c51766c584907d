use std::sync::{Arc, Weak};

use log::trace;
use nom::{
    IResult, Parser,
    bytes::complete::take,
    combinator::all_consuming,
    error::{ErrorKind, ParseError},
    multi::count,
    number::complete::{be_f32, be_f64, be_i32, be_i64, be_u16, be_u32, u8},
};

use crate::{
    class::{
        Annotation, AttributeInfo, ClassDescription, CodeAttribute, Const, ConstantPool,
        ConstantPoolInfo, ElementValue, ElementValuePair, ExceptionTableItem, FieldInfo,
        LineNumberTableItem, LocalVariable, MethodInfo, MethodParameter,
    },
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag},
    descriptor::{
        internal_to_qualified, parse_field_descriptor, parse_method_descriptor,
        parse_return_type_descriptor,
    },
    error::DecodeError,
};

const MAGIC: u32 = 0xcafe_babe;
const MIN_MAJOR_VERSION: u16 = 45;
const MAX_MAJOR_VERSION: u16 = 69;
/// Parameter slots of a method, including the receiver.
const MAX_PARAMETER_SLOTS: u32 = 255;
/// Nesting of annotation element values.
const MAX_ELEMENT_DEPTH: usize = 64;

/// Parse error carrying either a nom failure (mapped to a byte offset later) or a decode error
/// raised while interpreting the bytes.
#[derive(Debug)]
struct Failure<'a> {
    input: &'a [u8],
    cause: Cause,
}

#[derive(Debug)]
enum Cause {
    Nom(ErrorKind),
    Decode(DecodeError),
}

impl<'a> ParseError<&'a [u8]> for Failure<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        Failure {
            input,
            cause: Cause::Nom(kind),
        }
    }

    fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a [u8], T, Failure<'a>>;

fn fail(input: &[u8], error: DecodeError) -> nom::Err<Failure<'_>> {
    nom::Err::Failure(Failure {
        input,
        cause: Cause::Decode(error),
    })
}

trait OrFail<T> {
    fn or_fail(self, input: &[u8]) -> Result<T, nom::Err<Failure<'_>>>;
}

impl<T> OrFail<T> for Result<T, DecodeError> {
    fn or_fail(self, input: &[u8]) -> Result<T, nom::Err<Failure<'_>>> {
        self.map_err(|error| fail(input, error))
    }
}

/// Decodes a complete class file. The bytes must hold exactly one class file.
pub fn decode(bytes: &[u8]) -> Result<Arc<ClassDescription>, DecodeError> {
    match class_file(bytes) {
        Ok(class) => Ok(class),
        Err(nom::Err::Incomplete(_)) => Err(DecodeError::Truncated {
            offset: bytes.len(),
        }),
        Err(nom::Err::Error(failure) | nom::Err::Failure(failure)) => {
            let offset = bytes.len() - failure.input.len();
            Err(match failure.cause {
                Cause::Decode(error) => error,
                Cause::Nom(ErrorKind::Eof) => DecodeError::Truncated { offset },
                Cause::Nom(kind) => DecodeError::Malformed {
                    offset,
                    kind: kind.description().to_string(),
                },
            })
        }
    }
}

fn class_file(input: &[u8]) -> Result<Arc<ClassDescription>, nom::Err<Failure<'_>>> {
    let (input, (minor, major)) = parse_header(input)?;
    let (input, constant_pool) = parse_constant_pool(input)?;

    let (input, access_flags) = be_u16(input)?;
    let (input, this_class) = be_u16(input)?;
    let (input, super_class) = be_u16(input)?;
    let (input, interfaces) = parse_interfaces(input, &constant_pool)?;
    let (input, mut fields) = parse_fields(input, &constant_pool)?;
    let (input, mut methods) = parse_methods(input, &constant_pool)?;
    let (input, attributes) = parse_attributes(input, &constant_pool)?;

    if !input.is_empty() {
        return Err(fail(input, DecodeError::TrailingBytes(input.len())));
    }

    let this_class = qualified_class_name(&constant_pool, this_class).or_fail(input)?;
    let super_class = match super_class {
        0 => None,
        index => Some(qualified_class_name(&constant_pool, index).or_fail(input)?),
    };
    trace!(
        "decoded {this_class}: {} fields, {} methods",
        fields.len(),
        methods.len()
    );

    Ok(Arc::new_cyclic(|owner: &Weak<ClassDescription>| {
        for field in &mut fields {
            field.owner = owner.clone();
        }
        for method in &mut methods {
            method.owner = owner.clone();
        }
        ClassDescription {
            minor_version: minor,
            major_version: major,
            constant_pool,
            access_flags: ClassAccessFlag::from_bits_retain(access_flags),
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        }
    }))
}

fn qualified_class_name(pool: &ConstantPool, index: u16) -> Result<Arc<str>, DecodeError> {
    pool.class_name(index)
        .map(|name| Arc::from(internal_to_qualified(name)))
}

fn parse_header(input: &[u8]) -> PResult<'_, (u16, u16)> {
    let (input, magic) = be_u32(input)?;
    if magic != MAGIC {
        return Err(fail(input, DecodeError::BadMagic(magic)));
    }
    let (input, minor) = be_u16(input)?;
    let (input, major) = be_u16(input)?;
    if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
        return Err(fail(input, DecodeError::UnsupportedVersion { major, minor }));
    }
    Ok((input, (minor, major)))
}

fn parse_constant_pool(input: &[u8]) -> PResult<'_, ConstantPool> {
    let (input, constant_pool_count) = be_u16(input)?;
    let Some(slots) = (constant_pool_count as usize).checked_sub(1) else {
        return Err(fail(input, DecodeError::EmptyConstantPool));
    };

    let mut constant_pool = Vec::with_capacity(slots);

    let mut input = input;

    while constant_pool.len() < slots {
        let index = constant_pool.len() as u16 + 1;
        let constant;
        (input, constant) = parse_constant(input, index)?;
        let need_empty = constant.is_wide();
        constant_pool.push(constant);
        if need_empty {
            if constant_pool.len() == slots {
                // the phantom slot would fall outside the declared count
                return Err(fail(input, DecodeError::BadConstantIndex { index: index + 1 }));
            }
            constant_pool.push(ConstantPoolInfo::Empty);
        }
    }

    let constant_pool = ConstantPool::new(constant_pool);
    constant_pool.validate().or_fail(input)?;
    Ok((input, constant_pool))
}

fn parse_constant(mut input: &[u8], index: u16) -> PResult<'_, ConstantPoolInfo> {
    let tag;
    (input, tag) = u8(input)?;
    let cp_info = match tag {
        1 => {
            let length;
            (input, length) = be_u16(input)?;
            let bytes;
            (input, bytes) = take(length)(input)?;
            let string = cesu8::from_java_cesu8(bytes)
                .map_err(|_| fail(input, DecodeError::InvalidUtf8 { index }))?;
            ConstantPoolInfo::Utf8(Arc::from(string.as_ref()))
        }
        3 => {
            let int;
            (input, int) = be_i32(input)?;
            ConstantPoolInfo::Integer(int)
        }
        4 => {
            let float;
            (input, float) = be_f32(input)?;
            ConstantPoolInfo::Float(float)
        }
        5 => {
            let long;
            (input, long) = be_i64(input)?;
            ConstantPoolInfo::Long(long)
        }
        6 => {
            let double;
            (input, double) = be_f64(input)?;
            ConstantPoolInfo::Double(double)
        }
        7 => {
            let name_index;
            (input, name_index) = be_u16(input)?;
            ConstantPoolInfo::Class { name_index }
        }
        8 => {
            let string_index;
            (input, string_index) = be_u16(input)?;
            ConstantPoolInfo::String { string_index }
        }
        9 => {
            let (class_index, name_and_type_index);
            (input, class_index) = be_u16(input)?;
            (input, name_and_type_index) = be_u16(input)?;
            ConstantPoolInfo::Fieldref {
                class_index,
                name_and_type_index,
            }
        }
        10 => {
            let (class_index, name_and_type_index);
            (input, class_index) = be_u16(input)?;
            (input, name_and_type_index) = be_u16(input)?;
            ConstantPoolInfo::Methodref {
                class_index,
                name_and_type_index,
            }
        }
        11 => {
            let (class_index, name_and_type_index);
            (input, class_index) = be_u16(input)?;
            (input, name_and_type_index) = be_u16(input)?;
            ConstantPoolInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            }
        }
        12 => {
            let (name_index, descriptor_index);
            (input, name_index) = be_u16(input)?;
            (input, descriptor_index) = be_u16(input)?;
            ConstantPoolInfo::NameAndType {
                name_index,
                descriptor_index,
            }
        }
        15 => {
            let (reference_kind, reference_index);
            (input, reference_kind) = u8(input)?;
            (input, reference_index) = be_u16(input)?;
            ConstantPoolInfo::MethodHandle {
                reference_kind,
                reference_index,
            }
        }
        16 => {
            let descriptor_index;
            (input, descriptor_index) = be_u16(input)?;
            ConstantPoolInfo::MethodType { descriptor_index }
        }
        17 => {
            let (bootstrap_method_attr_index, name_and_type_index);
            (input, bootstrap_method_attr_index) = be_u16(input)?;
            (input, name_and_type_index) = be_u16(input)?;
            ConstantPoolInfo::Dynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            }
        }
        18 => {
            let (bootstrap_method_attr_index, name_and_type_index);
            (input, bootstrap_method_attr_index) = be_u16(input)?;
            (input, name_and_type_index) = be_u16(input)?;
            ConstantPoolInfo::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            }
        }
        19 => {
            let name_index;
            (input, name_index) = be_u16(input)?;
            ConstantPoolInfo::Module { name_index }
        }
        20 => {
            let name_index;
            (input, name_index) = be_u16(input)?;
            ConstantPoolInfo::Package { name_index }
        }
        _ => return Err(fail(input, DecodeError::InvalidConstantTag { tag, index })),
    };
    Ok((input, cp_info))
}

fn parse_interfaces<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, Vec<Arc<str>>> {
    let (input, interface_count) = be_u16(input)?;
    let (input, indices) = count(be_u16, interface_count as _).parse(input)?;
    let interfaces = indices
        .into_iter()
        .map(|index| qualified_class_name(pool, index))
        .collect::<Result<_, _>>()
        .or_fail(input)?;
    Ok((input, interfaces))
}

fn parse_fields<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, Vec<FieldInfo>> {
    let (input, field_count) = be_u16(input)?;
    count(|i: &'a [u8]| parse_field(i, pool), field_count as _).parse(input)
}

fn parse_field<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, FieldInfo> {
    let (input, access_flags) = be_u16(input)?;
    let (input, name_index) = be_u16(input)?;
    let (input, descriptor_index) = be_u16(input)?;
    let (input, attributes) = parse_attributes(input, pool)?;

    let name = pool.utf8(name_index).or_fail(input)?;
    let raw = pool.utf8(descriptor_index).or_fail(input)?;
    let (_, descriptor) = parse_field_descriptor(raw)
        .map_err(|_| fail(input, DecodeError::InvalidDescriptor(raw.to_string())))?;

    Ok((
        input,
        FieldInfo {
            access_flags: FieldAccessFlag::from_bits_retain(access_flags),
            name: Arc::clone(name),
            descriptor,
            attributes,
            owner: Weak::new(),
        },
    ))
}

fn parse_methods<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, Vec<MethodInfo>> {
    let (input, methods_count) = be_u16(input)?;
    count(|i: &'a [u8]| parse_method(i, pool), methods_count as _).parse(input)
}

fn parse_method<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, MethodInfo> {
    let (input, access_flags) = be_u16(input)?;
    let (input, name_index) = be_u16(input)?;
    let (input, descriptor_index) = be_u16(input)?;
    let (input, attributes) = parse_attributes(input, pool)?;

    let name = pool.utf8(name_index).or_fail(input)?;
    let raw = pool.utf8(descriptor_index).or_fail(input)?;
    let (_, descriptor) = parse_method_descriptor(raw)
        .map_err(|_| fail(input, DecodeError::InvalidDescriptor(raw.to_string())))?;
    let slots = u32::from(access_flags & MethodAccessFlag::STATIC.bits() == 0)
        + descriptor
            .parameters()
            .iter()
            .map(|ty| u32::from(ty.slot_size()))
            .sum::<u32>();
    if slots > MAX_PARAMETER_SLOTS {
        return Err(fail(input, DecodeError::InvalidDescriptor(raw.to_string())));
    }

    Ok((
        input,
        MethodInfo {
            access_flags: MethodAccessFlag::from_bits_retain(access_flags),
            name: Arc::clone(name),
            descriptor,
            attributes,
            owner: Weak::new(),
        },
    ))
}

type AttributeParser = for<'a> fn(&'a [u8], &ConstantPool) -> PResult<'a, AttributeInfo>;

const ATTRIBUTE_PARSERS: &[(&str, AttributeParser)] = &[
    ("Code", parse_code),
    ("ConstantValue", parse_constant_value),
    ("Deprecated", parse_deprecated),
    ("Synthetic", parse_synthetic),
    ("Signature", parse_signature),
    ("SourceFile", parse_source_file),
    ("Exceptions", parse_exceptions),
    ("LineNumberTable", parse_line_number_table),
    ("LocalVariableTable", parse_local_variable_table),
    ("MethodParameters", parse_method_parameters),
    ("RuntimeVisibleAnnotations", parse_runtime_visible_annotations),
];

fn parse_attributes<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, Vec<AttributeInfo>> {
    let (input, attributes_count) = be_u16(input)?;
    count(|i: &'a [u8]| parse_attribute(i, pool), attributes_count as _).parse(input)
}

/// Slices exactly `attribute_length` bytes and hands them to the parser registered for the
/// attribute name. A known attribute must consume its slice completely.
fn parse_attribute<'a>(start: &'a [u8], pool: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, attribute_name_index) = be_u16(start)?;
    let (input, attribute_length) = be_u32(input)?;
    let name = pool.utf8(attribute_name_index).or_fail(start)?;
    let (input, info) = take(attribute_length)(input)?;

    let Some((_, parser)) = ATTRIBUTE_PARSERS.iter().find(|(known, _)| *known == &**name) else {
        return Ok((
            input,
            AttributeInfo::Opaque {
                name: Arc::clone(name),
                info: Arc::from(info),
            },
        ));
    };

    let length_mismatch = || {
        fail(
            start,
            DecodeError::AttributeLength {
                name: name.to_string(),
                declared: attribute_length,
            },
        )
    };
    match parser(info, pool) {
        Ok(([], attribute)) => Ok((input, attribute)),
        Ok(_) => Err(length_mismatch()),
        // positions inside the slice are not offsets into the class file
        Err(nom::Err::Error(failure) | nom::Err::Failure(failure)) => match failure.cause {
            Cause::Nom(_) => Err(length_mismatch()),
            Cause::Decode(error) => Err(fail(start, error)),
        },
        Err(nom::Err::Incomplete(_)) => Err(length_mismatch()),
    }
}

fn parse_code<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, max_stack) = be_u16(input)?;
    let (input, max_locals) = be_u16(input)?;
    let (input, code_length) = be_u32(input)?;
    let (input, code) = take(code_length)(input)?;
    let (input, exception_table_length) = be_u16(input)?;
    let (input, exception_table) = count(
        |i: &'a [u8]| parse_exception_table_item(i, pool),
        exception_table_length as _,
    )
    .parse(input)?;
    let (input, attributes) = parse_attributes(input, pool)?;
    Ok((
        input,
        AttributeInfo::Code(CodeAttribute {
            max_stack,
            max_locals,
            code: Arc::from(code),
            exception_table,
            attributes,
        }),
    ))
}

fn parse_exception_table_item<'a>(
    input: &'a [u8],
    pool: &ConstantPool,
) -> PResult<'a, ExceptionTableItem> {
    let (input, start_pc) = be_u16(input)?;
    let (input, end_pc) = be_u16(input)?;
    let (input, handler_pc) = be_u16(input)?;
    let (input, catch_type) = be_u16(input)?;
    let catch_type = match catch_type {
        0 => None,
        index => Some(qualified_class_name(pool, index).or_fail(input)?),
    };
    Ok((
        input,
        ExceptionTableItem {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        },
    ))
}

fn parse_constant_value<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, index) = be_u16(input)?;
    let value = loadable_const(pool, index).or_fail(input)?;
    Ok((input, AttributeInfo::ConstantValue(value)))
}

fn loadable_const(pool: &ConstantPool, index: u16) -> Result<Const, DecodeError> {
    Ok(match pool.get(index)? {
        ConstantPoolInfo::Integer(v) => Const::Int(*v),
        ConstantPoolInfo::Float(v) => Const::Float(*v),
        ConstantPoolInfo::Long(v) => Const::Long(*v),
        ConstantPoolInfo::Double(v) => Const::Double(*v),
        ConstantPoolInfo::String { .. } => Const::String(Arc::clone(pool.string(index)?)),
        _ => {
            return Err(DecodeError::ConstantTypeMismatch {
                index,
                expected: "loadable",
            });
        }
    })
}

fn parse_deprecated<'a>(input: &'a [u8], _: &ConstantPool) -> PResult<'a, AttributeInfo> {
    Ok((input, AttributeInfo::Deprecated))
}

fn parse_synthetic<'a>(input: &'a [u8], _: &ConstantPool) -> PResult<'a, AttributeInfo> {
    Ok((input, AttributeInfo::Synthetic))
}

fn parse_signature<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, index) = be_u16(input)?;
    let signature = pool.utf8(index).or_fail(input)?;
    Ok((input, AttributeInfo::Signature(Arc::clone(signature))))
}

fn parse_source_file<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, index) = be_u16(input)?;
    let file = pool.utf8(index).or_fail(input)?;
    Ok((input, AttributeInfo::SourceFile(Arc::clone(file))))
}

fn parse_exceptions<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, number_of_exceptions) = be_u16(input)?;
    let (input, indices) = count(be_u16, number_of_exceptions as _).parse(input)?;
    let exceptions = indices
        .into_iter()
        .map(|index| qualified_class_name(pool, index))
        .collect::<Result<_, _>>()
        .or_fail(input)?;
    Ok((input, AttributeInfo::Exceptions(exceptions)))
}

fn parse_line_number_table<'a>(input: &'a [u8], _: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, length) = be_u16(input)?;
    let (input, items) = count(
        |i: &'a [u8]| -> PResult<'a, LineNumberTableItem> {
            let (i, start_pc) = be_u16(i)?;
            let (i, line_number) = be_u16(i)?;
            Ok((
                i,
                LineNumberTableItem {
                    start_pc,
                    line_number,
                },
            ))
        },
        length as _,
    )
    .parse(input)?;
    Ok((input, AttributeInfo::LineNumberTable(items)))
}

fn parse_local_variable_table<'a>(
    input: &'a [u8],
    pool: &ConstantPool,
) -> PResult<'a, AttributeInfo> {
    let (input, length) = be_u16(input)?;
    let (input, locals) = count(
        |i: &'a [u8]| parse_local_variable(i, pool),
        length as _,
    )
    .parse(input)?;
    Ok((input, AttributeInfo::LocalVariableTable(locals)))
}

fn parse_local_variable<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, LocalVariable> {
    let (input, start_pc) = be_u16(input)?;
    let (input, length) = be_u16(input)?;
    let (input, name_index) = be_u16(input)?;
    let (input, descriptor_index) = be_u16(input)?;
    let (input, index) = be_u16(input)?;

    let name = pool.utf8(name_index).or_fail(input)?;
    let raw = pool.utf8(descriptor_index).or_fail(input)?;
    let (_, descriptor) = parse_field_descriptor(raw)
        .map_err(|_| fail(input, DecodeError::InvalidDescriptor(raw.to_string())))?;
    Ok((
        input,
        LocalVariable {
            start_pc,
            length,
            name: Arc::clone(name),
            descriptor,
            index,
        },
    ))
}

fn parse_method_parameters<'a>(input: &'a [u8], pool: &ConstantPool) -> PResult<'a, AttributeInfo> {
    let (input, parameters_count) = u8(input)?;
    let (input, parameters) = count(
        |i: &'a [u8]| -> PResult<'a, MethodParameter> {
            let (i, name_index) = be_u16(i)?;
            let (i, access_flags) = be_u16(i)?;
            let name = match name_index {
                0 => None,
                index => Some(Arc::clone(pool.utf8(index).or_fail(i)?)),
            };
            Ok((i, MethodParameter { name, access_flags }))
        },
        parameters_count as _,
    )
    .parse(input)?;
    Ok((input, AttributeInfo::MethodParameters(parameters)))
}

fn parse_runtime_visible_annotations<'a>(
    input: &'a [u8],
    pool: &ConstantPool,
) -> PResult<'a, AttributeInfo> {
    let (input, num_annotations) = be_u16(input)?;
    let (input, annotations) = count(
        |i: &'a [u8]| parse_annotation(i, pool, 0),
        num_annotations as _,
    )
    .parse(input)?;
    Ok((input, AttributeInfo::RuntimeVisibleAnnotations(annotations)))
}

fn parse_annotation<'a>(
    input: &'a [u8],
    pool: &ConstantPool,
    depth: usize,
) -> PResult<'a, Annotation> {
    let (input, type_index) = be_u16(input)?;
    let raw = pool.utf8(type_index).or_fail(input)?;
    let (_, type_descriptor) = parse_field_descriptor(raw)
        .map_err(|_| fail(input, DecodeError::InvalidDescriptor(raw.to_string())))?;

    let (input, num_element_value_pairs) = be_u16(input)?;
    let (input, element_value_pairs) = count(
        |i: &'a [u8]| -> PResult<'a, ElementValuePair> {
            let (i, element_name_index) = be_u16(i)?;
            let element_name = Arc::clone(pool.utf8(element_name_index).or_fail(i)?);
            let (i, value) = parse_element_value(i, pool, depth + 1)?;
            Ok((
                i,
                ElementValuePair {
                    element_name,
                    value,
                },
            ))
        },
        num_element_value_pairs as _,
    )
    .parse(input)?;

    Ok((
        input,
        Annotation {
            type_descriptor,
            element_value_pairs,
        },
    ))
}

fn parse_element_value<'a>(
    input: &'a [u8],
    pool: &ConstantPool,
    depth: usize,
) -> PResult<'a, ElementValue> {
    if depth > MAX_ELEMENT_DEPTH {
        return Err(nom::Err::Error(Failure::from_error_kind(
            input,
            ErrorKind::TooLarge,
        )));
    }
    let (input, tag) = u8(input)?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            let (input, const_value_index) = be_u16(input)?;
            let value = if tag == b's' {
                Const::String(Arc::clone(pool.utf8(const_value_index).or_fail(input)?))
            } else {
                loadable_const(pool, const_value_index)
                    .or_fail(input)?
                    .narrow(tag)
            };
            Ok((input, ElementValue::Const(value)))
        }
        b'e' => {
            let (input, type_name_index) = be_u16(input)?;
            let (input, const_name_index) = be_u16(input)?;
            Ok((
                input,
                ElementValue::Enum {
                    type_name: Arc::clone(pool.utf8(type_name_index).or_fail(input)?),
                    const_name: Arc::clone(pool.utf8(const_name_index).or_fail(input)?),
                },
            ))
        }
        b'c' => {
            let (input, class_info_index) = be_u16(input)?;
            let raw = pool.utf8(class_info_index).or_fail(input)?;
            let (_, class) = all_consuming(parse_return_type_descriptor)
                .parse(raw)
                .map_err(|_| fail(input, DecodeError::InvalidDescriptor(raw.to_string())))?;
            Ok((input, ElementValue::Class(class)))
        }
        b'@' => {
            let (input, annotation) = parse_annotation(input, pool, depth)?;
            Ok((input, ElementValue::Annotation(annotation)))
        }
        b'[' => {
            let (input, num_values) = be_u16(input)?;
            let (input, values) = count(
                |i: &'a [u8]| parse_element_value(i, pool, depth + 1),
                num_values as _,
            )
            .parse(input)?;
            Ok((input, ElementValue::Array(values)))
        }
        _ => Err(nom::Err::Error(Failure::from_error_kind(
            input,
            ErrorKind::Switch,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(major: u16) -> Vec<u8> {
        let mut bytes = MAGIC.to_be_bytes().to_vec();
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&major.to_be_bytes());
        bytes
    }

    #[test]
    fn rejects_bad_magic() {
        assert_eq!(
            decode(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 52]).unwrap_err(),
            DecodeError::BadMagic(0xdeadbeef)
        );
    }

    #[test]
    fn rejects_unknown_versions() {
        assert_eq!(
            decode(&header(44)).unwrap_err(),
            DecodeError::UnsupportedVersion {
                major: 44,
                minor: 0
            }
        );
    }

    #[test]
    fn truncation_reports_offset() {
        assert_eq!(
            decode(&header(52)).unwrap_err(),
            DecodeError::Truncated { offset: 8 }
        );
        assert_eq!(
            decode(&[0xca, 0xfe]).unwrap_err(),
            DecodeError::Truncated { offset: 0 }
        );
    }

    #[test]
    fn zero_constant_pool_count() {
        let mut bytes = header(52);
        bytes.extend_from_slice(&0u16.to_be_bytes());
        assert_eq!(decode(&bytes).unwrap_err(), DecodeError::EmptyConstantPool);
    }

    #[test]
    fn unknown_constant_tag() {
        let mut bytes = header(52);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.push(2);
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::InvalidConstantTag { tag: 2, index: 1 }
        );
    }

    #[test]
    fn wide_constant_in_last_slot() {
        let mut bytes = header(52);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.push(5);
        bytes.extend_from_slice(&7i64.to_be_bytes());
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::BadConstantIndex { index: 2 }
        );
    }
}
