use std::sync::Arc;

use crate::error::DecodeError;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolInfo {
    Utf8(Arc<str>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    /// Second slot of a `Long` or `Double`.
    Empty,
}

impl ConstantPoolInfo {
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantPoolInfo::Long(_) | ConstantPoolInfo::Double(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRefKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A `Fieldref`/`Methodref`/`InterfaceMethodref` with every index followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub kind: MemberRefKind,
    pub class: Arc<str>,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
}

/// The constant pool of one class file. Indices are 1-based; slot 0 is never valid.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantPoolInfo>,
}

impl ConstantPool {
    pub(crate) fn new(entries: Vec<ConstantPoolInfo>) -> Self {
        Self { entries }
    }

    /// Number of slots, phantom slots included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Usable entries with their indices; phantom slots are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &ConstantPoolInfo)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, info)| !matches!(info, ConstantPoolInfo::Empty))
            .map(|(i, info)| (i as u16 + 1, info))
    }

    pub fn get(&self, index: u16) -> Result<&ConstantPoolInfo, DecodeError> {
        if index == 0 {
            return Err(DecodeError::BadConstantIndex { index });
        }
        match self.entries.get(index as usize - 1) {
            None => Err(DecodeError::BadConstantIndex { index }),
            Some(ConstantPoolInfo::Empty) => Err(DecodeError::PhantomSlot { index }),
            Some(info) => Ok(info),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&Arc<str>, DecodeError> {
        match self.get(index)? {
            ConstantPoolInfo::Utf8(string) => Ok(string),
            _ => Err(DecodeError::ConstantTypeMismatch {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Internal (slash separated) name of a `Class` entry.
    pub fn class_name(&self, index: u16) -> Result<&Arc<str>, DecodeError> {
        match self.get(index)? {
            ConstantPoolInfo::Class { name_index } => self.utf8(*name_index),
            _ => Err(DecodeError::ConstantTypeMismatch {
                index,
                expected: "Class",
            }),
        }
    }

    pub fn string(&self, index: u16) -> Result<&Arc<str>, DecodeError> {
        match self.get(index)? {
            ConstantPoolInfo::String { string_index } => self.utf8(*string_index),
            _ => Err(DecodeError::ConstantTypeMismatch {
                index,
                expected: "String",
            }),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&Arc<str>, &Arc<str>), DecodeError> {
        match self.get(index)? {
            ConstantPoolInfo::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(DecodeError::ConstantTypeMismatch {
                index,
                expected: "NameAndType",
            }),
        }
    }

    pub fn member_ref(&self, index: u16) -> Result<MemberRef, DecodeError> {
        let (kind, class_index, name_and_type_index) = match self.get(index)? {
            ConstantPoolInfo::Fieldref {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::Field, class_index, name_and_type_index),
            ConstantPoolInfo::Methodref {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::Method, class_index, name_and_type_index),
            ConstantPoolInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (
                MemberRefKind::InterfaceMethod,
                class_index,
                name_and_type_index,
            ),
            _ => {
                return Err(DecodeError::ConstantTypeMismatch {
                    index,
                    expected: "member reference",
                });
            }
        };
        let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
        Ok(MemberRef {
            kind,
            class: Arc::clone(self.class_name(*class_index)?),
            name: Arc::clone(name),
            descriptor: Arc::clone(descriptor),
        })
    }

    /// Checks that every index stored inside the pool lands on a usable slot of the expected kind.
    pub(crate) fn validate(&self) -> Result<(), DecodeError> {
        for (_, info) in self.iter() {
            match info {
                ConstantPoolInfo::Utf8(_)
                | ConstantPoolInfo::Integer(_)
                | ConstantPoolInfo::Float(_)
                | ConstantPoolInfo::Long(_)
                | ConstantPoolInfo::Double(_)
                | ConstantPoolInfo::Empty => {}
                ConstantPoolInfo::Class { name_index }
                | ConstantPoolInfo::Module { name_index }
                | ConstantPoolInfo::Package { name_index } => {
                    self.utf8(*name_index)?;
                }
                ConstantPoolInfo::String { string_index } => {
                    self.utf8(*string_index)?;
                }
                ConstantPoolInfo::Fieldref {
                    class_index,
                    name_and_type_index,
                }
                | ConstantPoolInfo::Methodref {
                    class_index,
                    name_and_type_index,
                }
                | ConstantPoolInfo::InterfaceMethodref {
                    class_index,
                    name_and_type_index,
                } => {
                    self.class_name(*class_index)?;
                    self.name_and_type(*name_and_type_index)?;
                }
                ConstantPoolInfo::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    self.utf8(*name_index)?;
                    self.utf8(*descriptor_index)?;
                }
                ConstantPoolInfo::MethodHandle {
                    reference_index, ..
                } => {
                    self.member_ref(*reference_index)?;
                }
                ConstantPoolInfo::MethodType { descriptor_index } => {
                    self.utf8(*descriptor_index)?;
                }
                ConstantPoolInfo::Dynamic {
                    name_and_type_index,
                    ..
                }
                | ConstantPoolInfo::InvokeDynamic {
                    name_and_type_index,
                    ..
                } => {
                    self.name_and_type(*name_and_type_index)?;
                }
            }
        }
        Ok(())
    }
}
