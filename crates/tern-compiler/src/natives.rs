//! Runtime entry points and compile-time functions.
//!
//! Natives have fixed numeric ids understood by the virtual machine. A
//! module must `require` a native by name before calling it, and the
//! compiler's own lowering requires some as well:
//!
//! | construct | native |
//! |---|---|
//! | `new C(..)` | `malloc` |
//! | `del p` | `free` |
//! | `new T[n]`, array literals | `heap_array` |

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::types::{CallableKind, CallableType, Type};

/// A native function and its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum Native {
    PrintInt = 0,
    PrintFloat = 1,
    PrintChar = 2,
    PrintByte = 3,
    PrintStr = 4,
    PrintlnInt = 5,
    PrintlnFloat = 6,
    PrintlnChar = 7,
    PrintlnByte = 8,
    PrintlnStr = 9,
    /// Seconds since an arbitrary epoch.
    Clock = 10,
    Malloc = 11,
    Free = 12,
    /// `heap_array(count, element_length)`: a zeroed, length-prefixed block.
    HeapArray = 13,
}

impl Native {
    pub const ALL: [Native; 14] = [
        Native::PrintInt,
        Native::PrintFloat,
        Native::PrintChar,
        Native::PrintByte,
        Native::PrintStr,
        Native::PrintlnInt,
        Native::PrintlnFloat,
        Native::PrintlnChar,
        Native::PrintlnByte,
        Native::PrintlnStr,
        Native::Clock,
        Native::Malloc,
        Native::Free,
        Native::HeapArray,
    ];

    /// Name used in `require` and at call sites.
    pub fn name(self) -> &'static str {
        match self {
            Native::PrintInt => "print_int",
            Native::PrintFloat => "print_float",
            Native::PrintChar => "print_char",
            Native::PrintByte => "print_byte",
            Native::PrintStr => "print_str",
            Native::PrintlnInt => "println_int",
            Native::PrintlnFloat => "println_float",
            Native::PrintlnChar => "println_char",
            Native::PrintlnByte => "println_byte",
            Native::PrintlnStr => "println_str",
            Native::Clock => "clock",
            Native::Malloc => "malloc",
            Native::Free => "free",
            Native::HeapArray => "heap_array",
        }
    }

    pub fn from_name(name: &str) -> Option<Native> {
        Native::ALL.into_iter().find(|n| n.name() == name)
    }

    pub fn id(self) -> u16 {
        self.into()
    }

    fn params(self) -> Vec<Type> {
        match self {
            Native::PrintInt | Native::PrintlnInt => vec![Type::INT],
            Native::PrintFloat | Native::PrintlnFloat => vec![Type::FLOAT],
            Native::PrintChar | Native::PrintlnChar => vec![Type::CHAR],
            Native::PrintByte | Native::PrintlnByte => vec![Type::BYTE],
            Native::PrintStr | Native::PrintlnStr => vec![Type::CHAR.array_of()],
            Native::Clock => vec![],
            Native::Malloc => vec![Type::INT],
            Native::Free => vec![Type::void_ptr()],
            Native::HeapArray => vec![Type::INT, Type::INT],
        }
    }

    fn ret(self) -> Type {
        match self {
            Native::Clock => Type::FLOAT,
            Native::Malloc | Native::HeapArray => Type::void_ptr(),
            _ => Type::VOID,
        }
    }

    pub fn signature(self) -> CallableType {
        CallableType {
            params: self.params(),
            ret: self.ret(),
            kind: CallableKind::NativeFunc,
        }
    }
}

/// Functions evaluated by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `sizeof(expr)`: static memory length; the operand is not evaluated.
    SizeOf,
    /// `len(array)`: the array's length word.
    Len,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 2] = [Intrinsic::SizeOf, Intrinsic::Len];

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::SizeOf => "sizeof",
            Intrinsic::Len => "len",
        }
    }

    pub fn ty(self) -> Type {
        Type::CompileTimeFunc {
            name: self.name().to_string(),
            ret: Box::new(Type::INT),
        }
    }
}
