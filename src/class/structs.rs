use std::sync::{Arc, Weak};

mod attributes;
mod constant_pool;

pub use attributes::*;
pub use constant_pool::*;

use crate::{
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag, method_modifiers},
    descriptor::{FieldDescriptor, FieldType, MethodDescriptor, simple_name},
};

/// A decoded class file. Every name is already resolved out of the constant pool and uses
/// dotted form (`java.util.Map$Entry`).
#[derive(Debug)]
pub struct ClassDescription {
    pub(crate) minor_version: u16,
    pub(crate) major_version: u16,
    pub(crate) constant_pool: ConstantPool,
    pub(crate) access_flags: ClassAccessFlag,
    pub(crate) this_class: Arc<str>,
    pub(crate) super_class: Option<Arc<str>>,
    pub(crate) interfaces: Vec<Arc<str>>,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) methods: Vec<MethodInfo>,
    pub(crate) attributes: Vec<AttributeInfo>,
}

impl ClassDescription {
    /// Fully qualified name.
    pub fn name(&self) -> &Arc<str> {
        &self.this_class
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.this_class)
    }

    /// Dotted package name, empty for the default package.
    pub fn package_name(&self) -> &str {
        let Some((package, _)) = self.this_class.rsplit_once('.') else {
            return "";
        };
        package
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn access_flags(&self) -> ClassAccessFlag {
        self.access_flags
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::INTERFACE)
    }

    pub fn is_public(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::PUBLIC)
    }

    /// `None` only for `java.lang.Object` (and module descriptors).
    pub fn super_class(&self) -> Option<&Arc<str>> {
        self.super_class.as_ref()
    }

    pub fn interfaces(&self) -> &[Arc<str>] {
        &self.interfaces
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> {
        self.methods.iter().filter(move |m| &*m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| &*f.name == name)
    }

    pub fn source_file(&self) -> Option<&str> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::SourceFile(file) => Some(&**file),
            _ => None,
        })
    }

    pub fn is_deprecated(&self) -> bool {
        is_deprecated(&self.attributes)
    }
}

#[derive(Debug)]
pub struct FieldInfo {
    pub(crate) access_flags: FieldAccessFlag,
    pub(crate) name: Arc<str>,
    pub(crate) descriptor: FieldDescriptor,
    pub(crate) attributes: Vec<AttributeInfo>,
    pub(crate) owner: Weak<ClassDescription>,
}

impl FieldInfo {
    pub fn access_flags(&self) -> FieldAccessFlag {
        self.access_flags
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.descriptor.0
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    /// The class this field was declared in, while that class is still alive.
    pub fn owner(&self) -> Option<Arc<ClassDescription>> {
        self.owner.upgrade()
    }

    pub fn is_public(&self) -> bool {
        self.access_flags.contains(FieldAccessFlag::PUBLIC)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlag::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.access_flags.contains(FieldAccessFlag::FINAL)
    }

    pub fn is_deprecated(&self) -> bool {
        is_deprecated(&self.attributes)
    }

    pub fn constant_value(&self) -> Option<&Const> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::ConstantValue(value) => Some(value),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub struct MethodInfo {
    pub(crate) access_flags: MethodAccessFlag,
    pub(crate) name: Arc<str>,
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) attributes: Vec<AttributeInfo>,
    pub(crate) owner: Weak<ClassDescription>,
}

impl MethodInfo {
    pub fn access_flags(&self) -> MethodAccessFlag {
        self.access_flags
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    /// The class this method was declared in, while that class is still alive.
    pub fn owner(&self) -> Option<Arc<ClassDescription>> {
        self.owner.upgrade()
    }

    pub fn is_constructor(&self) -> bool {
        &*self.name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        &*self.name == "<clinit>"
    }

    pub fn is_public(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::PUBLIC)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::ABSTRACT)
    }

    pub fn is_final(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::FINAL)
    }

    pub fn is_deprecated(&self) -> bool {
        is_deprecated(&self.attributes)
    }

    /// Bridge or synthetic method, emitted by the compiler without a source counterpart.
    pub fn is_compiler_generated(&self) -> bool {
        self.access_flags
            .intersects(MethodAccessFlag::BRIDGE | MethodAccessFlag::SYNTHETIC)
    }

    pub fn parameter_count(&self) -> usize {
        self.descriptor.parameters.len()
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    /// `void` for methods without a return value.
    pub fn return_type_name(&self, qualified: bool) -> String {
        match &self.descriptor.return_type {
            Some(ty) if qualified => ty.java_name(),
            Some(ty) => ty.simple_java_name(),
            None => "void".to_string(),
        }
    }

    /// Parameter name recorded by the compiler, from `MethodParameters` or the local variable
    /// table of the method body.
    pub fn parameter_name(&self, index: usize) -> Option<Arc<str>> {
        let params = &self.descriptor.parameters;
        if index >= params.len() {
            return None;
        }

        let recorded = self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::MethodParameters(parameters) => {
                parameters.get(index).and_then(|p| p.name.clone())
            }
            _ => None,
        });
        if recorded.is_some() {
            return recorded;
        }

        // receiver takes slot 0, long/double take two slots each
        let slot = u32::from(!self.is_static())
            + params[..index]
                .iter()
                .map(|ty| u32::from(ty.slot_size()))
                .sum::<u32>();
        let slot = u16::try_from(slot).ok()?;
        self.code()?
            .local_variables()
            .find(|local| local.index == slot && local.start_pc == 0)
            .map(|local| Arc::clone(&local.name))
    }

    /// `name(int, java.lang.String)`, unique among the members of one class.
    pub fn name_and_parameters(&self) -> String {
        let params: Vec<_> = self
            .descriptor
            .parameters
            .iter()
            .map(FieldType::java_name)
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// `public static int max(int a, int b)`, falling back to `argN` for unnamed parameters.
    pub fn signature(&self) -> String {
        let params: Vec<_> = self
            .descriptor
            .parameters
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                let name = self
                    .parameter_name(i)
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| format!("arg{i}"));
                format!("{} {}", ty.java_name(), name)
            })
            .collect();
        let modifiers = method_modifiers(self.access_flags);
        let mut signature = String::new();
        if !modifiers.is_empty() {
            signature.push_str(&modifiers);
            signature.push(' ');
        }
        signature.push_str(&self.return_type_name(true));
        signature.push(' ');
        signature.push_str(&self.name);
        signature.push('(');
        signature.push_str(&params.join(", "));
        signature.push(')');
        signature
    }
}
