bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

/// Java-source spelling of the visibility and modifier bits, e.g. `public static final`.
pub(crate) fn method_modifiers(flags: MethodAccessFlag) -> String {
    let mut words = Vec::new();
    if flags.contains(MethodAccessFlag::PUBLIC) {
        words.push("public");
    } else if flags.contains(MethodAccessFlag::PROTECTED) {
        words.push("protected");
    } else if flags.contains(MethodAccessFlag::PRIVATE) {
        words.push("private");
    }
    if flags.contains(MethodAccessFlag::ABSTRACT) {
        words.push("abstract");
    }
    if flags.contains(MethodAccessFlag::STATIC) {
        words.push("static");
    }
    if flags.contains(MethodAccessFlag::FINAL) {
        words.push("final");
    }
    if flags.contains(MethodAccessFlag::SYNCHRONIZED) {
        words.push("synchronized");
    }
    if flags.contains(MethodAccessFlag::NATIVE) {
        words.push("native");
    }
    words.join(" ")
}
