use std::sync::Arc;

use crate::descriptor::{FieldDescriptor, FieldType, ReturnType};

/// Attributes the decoder interprets. Anything else is kept as [`AttributeInfo::Opaque`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    Code(CodeAttribute),
    ConstantValue(Const),
    Deprecated,
    Synthetic,
    Signature(Arc<str>),
    SourceFile(Arc<str>),
    Exceptions(Vec<Arc<str>>),
    LineNumberTable(Vec<LineNumberTableItem>),
    LocalVariableTable(Vec<LocalVariable>),
    MethodParameters(Vec<MethodParameter>),
    RuntimeVisibleAnnotations(Vec<Annotation>),
    Opaque { name: Arc<str>, info: Arc<[u8]> },
}

impl AttributeInfo {
    pub fn name(&self) -> &str {
        match self {
            AttributeInfo::Code(_) => "Code",
            AttributeInfo::ConstantValue(_) => "ConstantValue",
            AttributeInfo::Deprecated => "Deprecated",
            AttributeInfo::Synthetic => "Synthetic",
            AttributeInfo::Signature(_) => "Signature",
            AttributeInfo::SourceFile(_) => "SourceFile",
            AttributeInfo::Exceptions(_) => "Exceptions",
            AttributeInfo::LineNumberTable(_) => "LineNumberTable",
            AttributeInfo::LocalVariableTable(_) => "LocalVariableTable",
            AttributeInfo::MethodParameters(_) => "MethodParameters",
            AttributeInfo::RuntimeVisibleAnnotations(_) => "RuntimeVisibleAnnotations",
            AttributeInfo::Opaque { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub(crate) max_stack: u16,
    pub(crate) max_locals: u16,
    pub(crate) code: Arc<[u8]>,
    pub(crate) exception_table: Vec<ExceptionTableItem>,
    pub(crate) attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn exception_table(&self) -> &[ExceptionTableItem] {
        &self.exception_table
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub(crate) fn local_variables(&self) -> impl Iterator<Item = &LocalVariable> {
        self.attributes
            .iter()
            .filter_map(|attr| match attr {
                AttributeInfo::LocalVariableTable(table) => Some(table),
                _ => None,
            })
            .flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableItem {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` for a catch-all handler.
    pub catch_type: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumberTableItem {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name: Arc<str>,
    pub descriptor: FieldDescriptor,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    /// `None` when the compiler recorded the parameter without a name.
    pub name: Option<Arc<str>>,
    pub access_flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub type_descriptor: FieldDescriptor,
    pub element_value_pairs: Vec<ElementValuePair>,
}

impl Annotation {
    pub fn is(&self, internal_name: &str) -> bool {
        matches!(&self.type_descriptor.0, FieldType::Object(name) if name == internal_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementValuePair {
    pub element_name: Arc<str>,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(Const),
    Enum {
        type_name: Arc<str>,
        const_name: Arc<str>,
    },
    Class(ReturnType),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Byte(i32),
    Char(i32),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i32),
    Boolean(i32),
    String(Arc<str>),
}

impl Const {
    /// Narrows an `Int` constant to the element-value kind named by `tag`.
    pub(crate) fn narrow(self, tag: u8) -> Self {
        let Const::Int(v) = self else {
            return self;
        };
        match tag {
            b'B' => Const::Byte(v),
            b'C' => Const::Char(v),
            b'S' => Const::Short(v),
            b'Z' => Const::Boolean(v),
            _ => Const::Int(v),
        }
    }
}

/// True when `attributes` carry either deprecation marker.
pub(crate) fn is_deprecated(attributes: &[AttributeInfo]) -> bool {
    attributes.iter().any(|attr| match attr {
        AttributeInfo::Deprecated => true,
        AttributeInfo::RuntimeVisibleAnnotations(annotations) => annotations
            .iter()
            .any(|annotation| annotation.is("java/lang/Deprecated")),
        _ => false,
    })
}
