//! Definitions of the Triangle Abstract Machine (TAM).

use std::fmt;

/// Machine value of `true`.
pub const TRUE: i16 = 1;
/// Machine value of `false`.
pub const FALSE: i16 = 0;

/// Address of the first instruction of a program.
pub const CODE_BASE: i16 = 0;

macro_rules! machine_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $repr:ty {
            $($variant:ident = $value:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr($repr)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl $name {
            pub const ALL: &[$name] = &[$($name::$variant,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

machine_enum! {
    /// Operation codes, one per instruction kind.
    pub enum OpCode: u8 {
        LOAD = 0,
        LOADA = 1,
        LOADI = 2,
        LOADL = 3,
        STORE = 4,
        STOREI = 5,
        CALL = 6,
        CALLI = 7,
        RETURN = 8,
        PUSH = 9,
        POP = 10,
        JUMP = 11,
        JUMPI = 12,
        JUMPIF = 13,
        HALT = 14,
    }
}

machine_enum! {
    /// Base address registers.
    pub enum Register: u8 {
        CB = 0,
        CT = 1,
        PB = 2,
        PT = 3,
        SB = 4,
        ST = 5,
        HB = 6,
        HT = 7,
        LB = 8,
        L1 = 9,
        L2 = 10,
        L3 = 11,
        L4 = 12,
        L5 = 13,
        L6 = 14,
        CP = 15,
    }
}

machine_enum! {
    /// Built-in routines, called relative to [`Register::PB`].
    pub enum Primitive: i16 {
        ID = 0,
        NOT = 1,
        AND = 2,
        OR = 3,
        SUCC = 4,
        PRED = 5,
        NEG = 6,
        ADD = 7,
        SUB = 8,
        MULT = 9,
        DIV = 10,
        MOD = 11,
        LT = 12,
        LE = 13,
        GE = 14,
        GT = 15,
        EQ = 16,
        NE = 17,
        EOL = 18,
        EOF = 19,
        GET = 20,
        PUT = 21,
        GETEOL = 22,
        PUTEOL = 23,
        GETINT = 24,
        PUTINT = 25,
        NEW = 26,
        DISPOSE = 27,
    }
}

impl Primitive {
    pub fn from_value(value: i16) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| *p as i16 == value)
    }
}
