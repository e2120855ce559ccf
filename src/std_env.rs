//! The standard environment: every name a program may use without declaring
//! it.

use std::fmt;

use crate::{codegen::tam::Primitive, types::SimpleType};

/// A built-in declaration.
#[derive(Debug, PartialEq, Eq)]
pub struct StdDecl {
    pub name: &'static str,
    pub kind: StdKind,
}

#[derive(Debug, PartialEq, Eq)]
pub enum StdKind {
    Type(SimpleType),
    Const {
        ty: SimpleType,
        value: i16,
    },
    /// A function or, if it returns [`SimpleType::Void`], a procedure.
    Function {
        primitive: Primitive,
        ret: SimpleType,
        param: Option<Formal>,
    },
    Binary {
        primitive: Primitive,
        lhs: SimpleType,
        rhs: SimpleType,
        ret: SimpleType,
    },
    Unary {
        primitive: Primitive,
        operand: SimpleType,
        ret: SimpleType,
    },
}

/// The single formal parameter of a built-in function.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Formal {
    pub ty: SimpleType,
    pub by_ref: bool,
}

impl StdDecl {
    /// What kind of declaration this is, as used in messages.
    pub fn describe(&self) -> &'static str {
        match self.kind {
            StdKind::Type(_) => "type",
            StdKind::Const { .. } => "constant",
            StdKind::Function {
                ret: SimpleType::Void,
                ..
            } => "procedure",
            StdKind::Function { .. } => "function",
            StdKind::Binary { .. } => "binary operator",
            StdKind::Unary { .. } => "unary operator",
        }
    }
}

impl fmt::Display for StdDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

macro_rules! function {
    ($name:literal, $primitive:ident, $ret:ident) => {
        StdDecl {
            name: $name,
            kind: StdKind::Function {
                primitive: Primitive::$primitive,
                ret: SimpleType::$ret,
                param: None,
            },
        }
    };
    ($name:literal, $primitive:ident, $ret:ident, ($param:ident, $by_ref:literal)) => {
        StdDecl {
            name: $name,
            kind: StdKind::Function {
                primitive: Primitive::$primitive,
                ret: SimpleType::$ret,
                param: Some(Formal {
                    ty: SimpleType::$param,
                    by_ref: $by_ref,
                }),
            },
        }
    };
}

macro_rules! binary {
    ($name:literal, $primitive:ident, $lhs:ident, $rhs:ident, $ret:ident) => {
        StdDecl {
            name: $name,
            kind: StdKind::Binary {
                primitive: Primitive::$primitive,
                lhs: SimpleType::$lhs,
                rhs: SimpleType::$rhs,
                ret: SimpleType::$ret,
            },
        }
    };
}

/// Read-only table of built-in declarations, keyed by name.
pub static STD_ENV: phf::Map<&'static str, StdDecl> = phf::phf_map! {
    "Integer" => StdDecl { name: "Integer", kind: StdKind::Type(SimpleType::Integer) },
    "Char" => StdDecl { name: "Char", kind: StdKind::Type(SimpleType::Char) },
    "Boolean" => StdDecl { name: "Boolean", kind: StdKind::Type(SimpleType::Boolean) },

    "true" => StdDecl {
        name: "true",
        kind: StdKind::Const { ty: SimpleType::Boolean, value: crate::codegen::tam::TRUE },
    },
    "false" => StdDecl {
        name: "false",
        kind: StdKind::Const { ty: SimpleType::Boolean, value: crate::codegen::tam::FALSE },
    },

    "+" => binary!("+", ADD, Integer, Integer, Integer),
    "-" => binary!("-", SUB, Integer, Integer, Integer),
    "*" => binary!("*", MULT, Integer, Integer, Integer),
    "/" => binary!("/", DIV, Integer, Integer, Integer),
    "<" => binary!("<", LT, Integer, Integer, Boolean),
    ">" => binary!(">", GT, Integer, Integer, Boolean),
    "=" => binary!("=", EQ, Any, Any, Boolean),
    "!" => StdDecl {
        name: "!",
        kind: StdKind::Unary {
            primitive: Primitive::NOT,
            operand: SimpleType::Boolean,
            ret: SimpleType::Boolean,
        },
    },

    "chr" => function!("chr", ID, Char, (Integer, false)),
    "ord" => function!("ord", ID, Integer, (Char, false)),
    "eof" => function!("eof", EOF, Boolean),
    "eol" => function!("eol", EOL, Boolean),

    "get" => function!("get", GET, Void, (Char, true)),
    "getint" => function!("getint", GETINT, Void, (Integer, true)),
    "put" => function!("put", PUT, Void, (Char, false)),
    "putint" => function!("putint", PUTINT, Void, (Integer, false)),
    "puteol" => function!("puteol", PUTEOL, Void),
};

pub fn lookup(name: &str) -> Option<&'static StdDecl> {
    STD_ENV.get(name)
}
