// program ::= command
// command ::= single-command (';' single-command)*
// single-command ::= ID ':=' expr
//                  | ID '(' param ')'
//                  | if '(' expr ')' then single-command [else single-command] endif
//                  | while '(' expr ')' do single-command
//                  | let declaration in single-command
//                  | begin command end
//                  | for ID ':=' expr to expr do single-command next
//                  | <empty>
// declaration ::= single-declaration (';' single-declaration)*
// single-declaration ::= const ID '~' expr
//                      | var ID ':' type-denoter
// type-denoter ::= ID
// param ::= <empty> | var ID | expr
// expr ::= primary (OPERATOR primary)*
// primary ::= INT | CHAR | ID ['(' param ')'] | OPERATOR primary | '(' expr ')'

// There are no precedence levels: every binary operator is left associative
// and binds as tightly as any other.

use std::fmt;

use crate::token::Position;

/// Identifies a decorated node within a single [`Program`].
///
/// Identifiers are dense and assigned by the parser in source order, so side
/// tables may be sized with [`Program::node_count`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(index: u32) -> NodeId {
        NodeId(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, PartialEq)]
pub struct Program {
    pub command: Command,
    /// Number of [`NodeId`]s handed out while parsing.
    pub node_count: usize,
}

#[derive(Debug, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub position: Position,
}

impl Command {
    pub fn error(position: Position) -> Command {
        Command {
            kind: CommandKind::Error,
            position,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CommandKind {
    Assign {
        target: Ident,
        value: Expr,
    },
    /// The empty command.
    Blank,
    Call {
        callee: Ident,
        param: Param,
    },
    If {
        condition: Expr,
        then_branch: Box<Command>,
    },
    IfElse {
        condition: Expr,
        then_branch: Box<Command>,
        else_branch: Box<Command>,
    },
    While {
        condition: Expr,
        body: Box<Command>,
    },
    For {
        variable: LoopVar,
        start: Expr,
        bound: Expr,
        body: Box<Command>,
    },
    Let {
        declaration: Box<Declaration>,
        body: Box<Command>,
    },
    /// At least two commands.
    Sequential(Vec<Command>),
    Error,
}

#[derive(Debug, PartialEq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub position: Position,
}

impl Declaration {
    pub fn error(position: Position) -> Declaration {
        Declaration {
            kind: DeclKind::Error,
            position,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum DeclKind {
    Const(ConstDecl),
    Var(VarDecl),
    /// At least two declarations.
    Sequential(Vec<Declaration>),
    Error,
}

#[derive(Debug, PartialEq)]
pub struct ConstDecl {
    pub id: NodeId,
    pub name: Ident,
    pub value: Expr,
}

#[derive(Debug, PartialEq)]
pub struct VarDecl {
    pub id: NodeId,
    pub name: Ident,
    pub ty: TypeDenoter,
}

/// The control variable of a `for` command. It is an implicitly declared
/// `Integer` variable scoped to the loop.
#[derive(Debug, PartialEq)]
pub struct LoopVar {
    pub id: NodeId,
    pub name: Ident,
}

#[derive(Debug, PartialEq)]
pub struct TypeDenoter {
    pub id: NodeId,
    pub name: Ident,
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub position: Position,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Binary {
        op: Operator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: Operator,
        operand: Box<Expr>,
    },
    Char(CharLiteral),
    Int(IntLiteral),
    Id(Ident),
    Call {
        callee: Ident,
        param: Box<Param>,
    },
    Error,
}

#[derive(Debug, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub kind: ParamKind,
    pub position: Position,
}

#[derive(Debug, PartialEq)]
pub enum ParamKind {
    Blank,
    Expr(Expr),
    /// A by-reference argument, `var x`.
    Var(Ident),
    Error,
}

#[derive(Debug, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub spelling: Box<str>,
    pub position: Position,
}

#[derive(Debug, PartialEq)]
pub struct Operator {
    pub id: NodeId,
    pub spelling: Box<str>,
    pub position: Position,
}

#[derive(Debug, PartialEq)]
pub struct IntLiteral {
    pub spelling: Box<str>,
    pub position: Position,
}

impl IntLiteral {
    /// The machine value of this literal, or `None` if it doesn't fit in a
    /// machine word.
    pub fn value(&self) -> Option<i16> {
        self.spelling.parse().ok()
    }
}

#[derive(Debug, PartialEq)]
pub struct CharLiteral {
    /// Includes the surrounding quotes.
    pub spelling: Box<str>,
    pub position: Position,
}

impl CharLiteral {
    pub fn char(&self) -> char {
        self.spelling.chars().nth(1).unwrap_or_default()
    }

    /// The machine value of this literal, or `None` if its code point doesn't
    /// fit in a machine word.
    pub fn value(&self) -> Option<i16> {
        i16::try_from(u32::from(self.char())).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(spelling: &str) -> IntLiteral {
        IntLiteral {
            spelling: spelling.into(),
            position: Position::new(1, 1),
        }
    }

    fn char(spelling: &str) -> CharLiteral {
        CharLiteral {
            spelling: spelling.into(),
            position: Position::new(1, 1),
        }
    }

    #[test]
    fn int_literal_value() {
        assert_eq!(int("0").value(), Some(0));
        assert_eq!(int("32767").value(), Some(i16::MAX));
        assert_eq!(int("32768").value(), None);
        assert_eq!(int("99999999999").value(), None);
    }

    #[test]
    fn char_literal_value() {
        assert_eq!(char("'a'").value(), Some(97));
        assert_eq!(char("' '").value(), Some(32));
        assert_eq!(char("'\u{10348}'").value(), None);
    }
}
