#![allow(dead_code)]

use std::{collections::HashMap, fs, io::Write, path::Path};

use byteorder::{BigEndian, WriteBytesExt};
use zip::{ZipWriter, write::SimpleFileOptions};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;

/// Extra attributes attached to a member.
#[derive(Debug, Clone)]
pub enum Attr {
    Deprecated,
    /// `MethodParameters` with one entry per name; an empty name is recorded as absent.
    MethodParameters(Vec<&'static str>),
    /// A one-instruction `Code` body with a `LocalVariableTable` of `(slot, name, descriptor)`.
    Locals(Vec<(u16, &'static str, &'static str)>),
    ConstantInt(i32),
    ConstantString(&'static str),
    SourceFile(&'static str),
    /// Any attribute name with a raw body.
    Raw(&'static str, Vec<u8>),
}

struct Member {
    access: u16,
    name: u16,
    descriptor: u16,
    attributes: Vec<u8>,
    attribute_count: u16,
}

/// Assembles a class file in memory. Names are internal (`com/acme/Widget`).
pub struct ClassFileBuilder {
    major: u16,
    pool: Vec<u8>,
    next_index: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    attributes: Vec<u8>,
    attribute_count: u16,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        let mut builder = Self {
            major: 52,
            pool: vec![],
            next_index: 1,
            utf8: HashMap::new(),
            classes: HashMap::new(),
            access: ACC_PUBLIC,
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
            attribute_count: 0,
        };
        builder.this_class = builder.class(name);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    pub fn interface(name: &str) -> Self {
        let mut builder = Self::new(name);
        builder.access = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        builder
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8.get(value) {
            return index;
        }
        self.pool.write_u8(1).unwrap();
        self.pool.write_u16::<BigEndian>(value.len() as u16).unwrap();
        self.pool.extend_from_slice(value.as_bytes());
        let index = self.take_slot(1);
        self.utf8.insert(value.to_string(), index);
        index
    }

    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        self.pool.write_u8(7).unwrap();
        self.pool.write_u16::<BigEndian>(name_index).unwrap();
        let index = self.take_slot(1);
        self.classes.insert(name.to_string(), index);
        index
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.pool.write_u8(3).unwrap();
        self.pool.write_i32::<BigEndian>(value).unwrap();
        self.take_slot(1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.pool.write_u8(5).unwrap();
        self.pool.write_i64::<BigEndian>(value).unwrap();
        self.take_slot(2)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.pool.write_u8(8).unwrap();
        self.pool.write_u16::<BigEndian>(utf8).unwrap();
        self.take_slot(1)
    }

    fn take_slot(&mut self, width: u16) -> u16 {
        let index = self.next_index;
        self.next_index += width;
        index
    }

    pub fn version(mut self, major: u16) -> Self {
        self.major = major;
        self
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn extends(mut self, name: &str) -> Self {
        self.super_class = self.class(name);
        self
    }

    pub fn no_super(mut self) -> Self {
        self.super_class = 0;
        self
    }

    pub fn implements(mut self, name: &str) -> Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    pub fn field(self, access: u16, name: &str, descriptor: &str) -> Self {
        self.field_with(access, name, descriptor, vec![])
    }

    pub fn field_with(mut self, access: u16, name: &str, descriptor: &str, attrs: Vec<Attr>) -> Self {
        let member = self.member(access, name, descriptor, attrs);
        self.fields.push(member);
        self
    }

    pub fn method(self, access: u16, name: &str, descriptor: &str) -> Self {
        self.method_with(access, name, descriptor, vec![])
    }

    pub fn method_with(mut self, access: u16, name: &str, descriptor: &str, attrs: Vec<Attr>) -> Self {
        let member = self.member(access, name, descriptor, attrs);
        self.methods.push(member);
        self
    }

    pub fn attribute(mut self, attr: Attr) -> Self {
        let mut bytes = vec![];
        self.encode_attribute(&attr, &mut bytes);
        self.attributes.extend(bytes);
        self.attribute_count += 1;
        self
    }

    fn member(&mut self, access: u16, name: &str, descriptor: &str, attrs: Vec<Attr>) -> Member {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut attributes = vec![];
        for attr in &attrs {
            self.encode_attribute(attr, &mut attributes);
        }
        Member {
            access,
            name,
            descriptor,
            attributes,
            attribute_count: attrs.len() as u16,
        }
    }

    fn encode_attribute(&mut self, attr: &Attr, out: &mut Vec<u8>) {
        let (name, body) = match attr {
            Attr::Deprecated => ("Deprecated", vec![]),
            Attr::MethodParameters(names) => {
                let mut body = vec![names.len() as u8];
                for name in names {
                    let index = if name.is_empty() { 0 } else { self.utf8(name) };
                    body.write_u16::<BigEndian>(index).unwrap();
                    body.write_u16::<BigEndian>(0).unwrap();
                }
                ("MethodParameters", body)
            }
            Attr::Locals(locals) => {
                let mut table = vec![];
                table.write_u16::<BigEndian>(locals.len() as u16).unwrap();
                for (slot, name, descriptor) in locals {
                    table.write_u16::<BigEndian>(0).unwrap();
                    table.write_u16::<BigEndian>(1).unwrap();
                    let name = self.utf8(name);
                    let descriptor = self.utf8(descriptor);
                    table.write_u16::<BigEndian>(name).unwrap();
                    table.write_u16::<BigEndian>(descriptor).unwrap();
                    table.write_u16::<BigEndian>(*slot).unwrap();
                }
                let table_name = self.utf8("LocalVariableTable");

                let mut body = vec![];
                body.write_u16::<BigEndian>(1).unwrap();
                body.write_u16::<BigEndian>(8).unwrap();
                body.write_u32::<BigEndian>(1).unwrap();
                // return
                body.write_u8(0xb1).unwrap();
                body.write_u16::<BigEndian>(0).unwrap();
                body.write_u16::<BigEndian>(1).unwrap();
                body.write_u16::<BigEndian>(table_name).unwrap();
                body.write_u32::<BigEndian>(table.len() as u32).unwrap();
                body.extend(table);
                ("Code", body)
            }
            Attr::ConstantInt(value) => {
                let index = self.integer(*value);
                ("ConstantValue", index.to_be_bytes().to_vec())
            }
            Attr::ConstantString(value) => {
                let index = self.string(value);
                ("ConstantValue", index.to_be_bytes().to_vec())
            }
            Attr::SourceFile(file) => {
                let index = self.utf8(file);
                ("SourceFile", index.to_be_bytes().to_vec())
            }
            Attr::Raw(name, body) => (*name, body.clone()),
        };
        let name = self.utf8(name);
        out.write_u16::<BigEndian>(name).unwrap();
        out.write_u32::<BigEndian>(body.len() as u32).unwrap();
        out.extend(body);
    }

    pub fn build(self) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.write_u32::<BigEndian>(0xcafe_babe).unwrap();
        bytes.write_u16::<BigEndian>(0).unwrap();
        bytes.write_u16::<BigEndian>(self.major).unwrap();
        bytes.write_u16::<BigEndian>(self.next_index).unwrap();
        bytes.extend(&self.pool);
        bytes.write_u16::<BigEndian>(self.access).unwrap();
        bytes.write_u16::<BigEndian>(self.this_class).unwrap();
        bytes.write_u16::<BigEndian>(self.super_class).unwrap();
        bytes.write_u16::<BigEndian>(self.interfaces.len() as u16).unwrap();
        for interface in &self.interfaces {
            bytes.write_u16::<BigEndian>(*interface).unwrap();
        }
        for members in [&self.fields, &self.methods] {
            bytes.write_u16::<BigEndian>(members.len() as u16).unwrap();
            for member in members {
                bytes.write_u16::<BigEndian>(member.access).unwrap();
                bytes.write_u16::<BigEndian>(member.name).unwrap();
                bytes.write_u16::<BigEndian>(member.descriptor).unwrap();
                bytes.write_u16::<BigEndian>(member.attribute_count).unwrap();
                bytes.extend(&member.attributes);
            }
        }
        bytes.write_u16::<BigEndian>(self.attribute_count).unwrap();
        bytes.extend(&self.attributes);
        bytes
    }
}

/// Writes `(entry name, bytes)` pairs into a new archive.
pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

/// Writes `(relative path, bytes)` pairs under `root`, creating directories.
pub fn write_tree(root: &Path, entries: &[(&str, Vec<u8>)]) {
    for (name, bytes) in entries {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }
}

/// Entry name of a class, `com/acme/Widget.class`.
pub fn entry(internal_name: &str) -> String {
    format!("{internal_name}.class")
}
