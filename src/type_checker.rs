use tracing::debug;

use crate::{
    ast::{
        Command, CommandKind, DeclKind, Declaration, Expr, ExprKind, Ident, NodeId, Operator,
        Param, ParamKind, Program, TypeDenoter,
    },
    diagnostics::Reporter,
    resolver::{DeclRef, Resolution},
    std_env::{StdDecl, StdKind},
    token::Position,
    types::SimpleType,
    util::table::NodeTable,
};

/// Types of expressions, parameters and type denoters, plus the entity type
/// of every declared constant and variable (keyed by the declaration's id).
pub struct Types {
    types: NodeTable<SimpleType>,
}

impl Types {
    pub fn new(node_count: usize) -> Types {
        Types {
            types: NodeTable::new(node_count),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<SimpleType> {
        self.types.get(id).copied()
    }

    /// # Panics
    ///
    /// If the node is already typed.
    pub fn set(&mut self, id: NodeId, ty: SimpleType) {
        self.types.set(id, ty);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("`{name}` is not a variable")]
    NotAVariable { name: Box<str> },
    #[error("`{name}` is not a type")]
    NotAType { name: Box<str> },
    #[error("`{name}` is a {what}, not a value")]
    NotAValue { name: Box<str>, what: &'static str },
    #[error("`{name}` is used in its own declaration")]
    UsedInOwnDeclaration { name: Box<str> },
    #[error("`{name}` is not a function or procedure")]
    NotCallable { name: Box<str> },
    #[error("`{name}` is a function, its result must be used")]
    FunctionAsCommand { name: Box<str> },
    #[error("`{name}` is a procedure and has no value")]
    ProcedureAsExpression { name: Box<str> },
    #[error("`{name}` expects {expected} argument(s), but got {actual}")]
    ArityMismatch {
        name: Box<str>,
        expected: usize,
        actual: usize,
    },
    #[error("argument of `{name}` must be {expected}, but got {actual}")]
    ArgumentMismatch {
        name: Box<str>,
        expected: SimpleType,
        actual: SimpleType,
    },
    #[error("`{name}` takes its argument by reference, pass a `var` parameter")]
    ExpectedVarParameter { name: Box<str> },
    #[error("`{name}` takes its argument by value, `var` is not allowed")]
    UnexpectedVarParameter { name: Box<str> },
    #[error("cannot assign {actual} to `{name}` of type {expected}")]
    AssignmentMismatch {
        name: Box<str>,
        expected: SimpleType,
        actual: SimpleType,
    },
    #[error("condition must be Boolean, but got {actual}")]
    Condition { actual: SimpleType },
    #[error("loop bound must be Integer, but got {actual}")]
    LoopBound { actual: SimpleType },
    #[error("operand of `{op}` must be {expected}, but got {actual}")]
    OperandMismatch {
        op: Box<str>,
        expected: SimpleType,
        actual: SimpleType,
    },
    #[error("operands of `{op}` must have the same type, but got {lhs} and {rhs}")]
    OperandsDiffer {
        op: Box<str>,
        lhs: SimpleType,
        rhs: SimpleType,
    },
    #[error("`{op}` is not a binary operator")]
    NotABinaryOperator { op: Box<str> },
    #[error("`{op}` is not a unary operator")]
    NotAUnaryOperator { op: Box<str> },
    #[error("integer literal {spelling} is too large")]
    IntegerTooLarge { spelling: Box<str> },
    #[error("character literal {spelling} is out of range")]
    CharOutOfRange { spelling: Box<str> },
}

/// Types the resolved program.
///
/// Checks involving a name the resolver couldn't link, or an operand whose
/// type is unknown, are skipped; the cause was reported already.
pub fn check(program: &Program, resolution: &Resolution, reporter: &mut Reporter) -> Types {
    debug!("checking types");
    let mut checker = Checker {
        resolution,
        types: Types::new(program.node_count),
        pending_const: None,
        reporter,
    };
    checker.check_command(&program.command);
    checker.types
}

struct Checker<'a, 'rep> {
    resolution: &'a Resolution,
    types: Types,
    /// The constant declaration whose value is being checked.
    pending_const: Option<NodeId>,
    reporter: &'rep mut Reporter,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum CallSite {
    Command,
    Expression,
}

impl Checker<'_, '_> {
    fn check_command(&mut self, command: &Command) {
        match &command.kind {
            CommandKind::Assign { target, value } => {
                let value_ty = self.check_expr(value);
                match self.resolution.get(target.id) {
                    Some(DeclRef::Var(id)) => {
                        if let (Some(expected), Some(actual)) = (self.types.get(id), value_ty) {
                            if expected != actual {
                                let error = Error::AssignmentMismatch {
                                    name: target.spelling.clone(),
                                    expected,
                                    actual,
                                };
                                self.report(value.position, error);
                            }
                        }
                    }
                    Some(_) => self.report(target.position, not_a_variable(target)),
                    None => {}
                }
            }
            CommandKind::Call { callee, param } => {
                self.check_call(callee, param, CallSite::Command);
            }
            CommandKind::If {
                condition,
                then_branch,
            } => {
                self.check_condition(condition);
                self.check_command(then_branch);
            }
            CommandKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition);
                self.check_command(then_branch);
                self.check_command(else_branch);
            }
            CommandKind::While { condition, body } => {
                self.check_condition(condition);
                self.check_command(body);
            }
            CommandKind::For {
                variable,
                start,
                bound,
                body,
            } => {
                self.types.set(variable.id, SimpleType::Integer);
                self.check_loop_bound(start);
                self.check_loop_bound(bound);
                self.check_command(body);
            }
            CommandKind::Let { declaration, body } => {
                self.check_declaration(declaration);
                self.check_command(body);
            }
            CommandKind::Sequential(commands) => {
                for command in commands {
                    self.check_command(command);
                }
            }
            CommandKind::Blank | CommandKind::Error => {}
        }
    }

    fn check_declaration(&mut self, declaration: &Declaration) {
        match &declaration.kind {
            DeclKind::Const(decl) => {
                self.pending_const = Some(decl.id);
                let ty = self.check_expr(&decl.value);
                self.pending_const = None;
                if let Some(ty) = ty {
                    self.types.set(decl.id, ty);
                }
            }
            DeclKind::Var(decl) => {
                if let Some(ty) = self.check_type_denoter(&decl.ty) {
                    self.types.set(decl.id, ty);
                }
            }
            DeclKind::Sequential(declarations) => {
                for declaration in declarations {
                    self.check_declaration(declaration);
                }
            }
            DeclKind::Error => {}
        }
    }

    fn check_type_denoter(&mut self, denoter: &TypeDenoter) -> Option<SimpleType> {
        let ty = match self.resolution.get(denoter.name.id)? {
            DeclRef::Std(StdDecl {
                kind: StdKind::Type(ty),
                ..
            }) => *ty,
            _ => {
                let error = Error::NotAType {
                    name: denoter.name.spelling.clone(),
                };
                self.report(denoter.name.position, error);
                return None;
            }
        };
        self.types.set(denoter.id, ty);
        Some(ty)
    }

    fn check_condition(&mut self, condition: &Expr) {
        match self.check_expr(condition) {
            Some(SimpleType::Boolean) | None => {}
            Some(actual) => self.report(condition.position, Error::Condition { actual }),
        }
    }

    fn check_loop_bound(&mut self, bound: &Expr) {
        match self.check_expr(bound) {
            Some(SimpleType::Integer) | None => {}
            Some(actual) => self.report(bound.position, Error::LoopBound { actual }),
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Option<SimpleType> {
        let ty = match &expr.kind {
            ExprKind::Int(literal) => {
                if literal.value().is_none() {
                    let error = Error::IntegerTooLarge {
                        spelling: literal.spelling.clone(),
                    };
                    self.report(literal.position, error);
                }
                Some(SimpleType::Integer)
            }
            ExprKind::Char(literal) => {
                if literal.value().is_none() {
                    let error = Error::CharOutOfRange {
                        spelling: literal.spelling.clone(),
                    };
                    self.report(literal.position, error);
                }
                Some(SimpleType::Char)
            }
            ExprKind::Id(ident) => self.check_id(ident),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(op, lhs, rhs),
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(operand);
                match self.resolution.get(op.id) {
                    Some(DeclRef::Std(StdDecl {
                        kind:
                            StdKind::Unary {
                                operand: expected,
                                ret,
                                ..
                            },
                        ..
                    })) => {
                        self.check_operand(&op.spelling, *expected, operand_ty, operand.position);
                        Some(*ret)
                    }
                    Some(_) => {
                        let error = Error::NotAUnaryOperator {
                            op: op.spelling.clone(),
                        };
                        self.report(op.position, error);
                        None
                    }
                    None => None,
                }
            }
            ExprKind::Call { callee, param } => {
                self.check_call(callee, param, CallSite::Expression)
            }
            ExprKind::Error => None,
        };
        if let Some(ty) = ty {
            self.types.set(expr.id, ty);
        }
        ty
    }

    fn check_binary(&mut self, op: &Operator, lhs: &Expr, rhs: &Expr) -> Option<SimpleType> {
        let lhs_ty = self.check_expr(lhs);
        let rhs_ty = self.check_expr(rhs);
        match self.resolution.get(op.id)? {
            DeclRef::Std(StdDecl {
                kind:
                    StdKind::Binary {
                        lhs: SimpleType::Any,
                        ret,
                        ..
                    },
                ..
            }) => {
                if let (Some(lhs_ty), Some(rhs_ty)) = (lhs_ty, rhs_ty) {
                    if lhs_ty != rhs_ty {
                        let error = Error::OperandsDiffer {
                            op: op.spelling.clone(),
                            lhs: lhs_ty,
                            rhs: rhs_ty,
                        };
                        self.report(op.position, error);
                    }
                }
                Some(*ret)
            }
            DeclRef::Std(StdDecl {
                kind:
                    StdKind::Binary {
                        lhs: expected_lhs,
                        rhs: expected_rhs,
                        ret,
                        ..
                    },
                ..
            }) => {
                self.check_operand(&op.spelling, *expected_lhs, lhs_ty, lhs.position);
                self.check_operand(&op.spelling, *expected_rhs, rhs_ty, rhs.position);
                Some(*ret)
            }
            _ => {
                let error = Error::NotABinaryOperator {
                    op: op.spelling.clone(),
                };
                self.report(op.position, error);
                None
            }
        }
    }

    fn check_id(&mut self, ident: &Ident) -> Option<SimpleType> {
        match self.resolution.get(ident.id)? {
            DeclRef::Std(StdDecl {
                kind: StdKind::Const { ty, .. },
                ..
            }) => Some(*ty),
            DeclRef::Std(decl) => {
                let error = Error::NotAValue {
                    name: ident.spelling.clone(),
                    what: decl.describe(),
                };
                self.report(ident.position, error);
                None
            }
            DeclRef::Const(id) if self.pending_const == Some(id) => {
                let error = Error::UsedInOwnDeclaration {
                    name: ident.spelling.clone(),
                };
                self.report(ident.position, error);
                None
            }
            DeclRef::Const(id) | DeclRef::Var(id) => self.types.get(id),
        }
    }

    fn check_operand(
        &mut self,
        op: &str,
        expected: SimpleType,
        actual: Option<SimpleType>,
        position: Position,
    ) {
        if let Some(actual) = actual {
            if actual != expected {
                let error = Error::OperandMismatch {
                    op: op.into(),
                    expected,
                    actual,
                };
                self.report(position, error);
            }
        }
    }

    /// Checks a call, returning the type of its value when used as an
    /// expression.
    fn check_call(&mut self, callee: &Ident, param: &Param, site: CallSite) -> Option<SimpleType> {
        let param_ty = self.check_param(param);
        let name = || callee.spelling.clone();

        let (ret, formal) = match self.resolution.get(callee.id)? {
            DeclRef::Std(StdDecl {
                kind: StdKind::Function { ret, param, .. },
                ..
            }) => (*ret, *param),
            _ => {
                self.report(callee.position, Error::NotCallable { name: name() });
                return None;
            }
        };

        match site {
            CallSite::Command if ret != SimpleType::Void => {
                self.report(callee.position, Error::FunctionAsCommand { name: name() });
            }
            CallSite::Expression if ret == SimpleType::Void => {
                self.report(callee.position, Error::ProcedureAsExpression { name: name() });
            }
            _ => {}
        }

        let actual = usize::from(!matches!(param.kind, ParamKind::Blank));
        let expected = usize::from(formal.is_some());
        if let (Some(formal), 1) = (formal, actual) {
            match (&param.kind, formal.by_ref) {
                (ParamKind::Var(_), false) => {
                    self.report(param.position, Error::UnexpectedVarParameter { name: name() });
                }
                (ParamKind::Expr(_), true) => {
                    self.report(param.position, Error::ExpectedVarParameter { name: name() });
                }
                _ => {}
            }
            if let Some(actual) = param_ty {
                if actual != formal.ty {
                    let error = Error::ArgumentMismatch {
                        name: name(),
                        expected: formal.ty,
                        actual,
                    };
                    self.report(param.position, error);
                }
            }
        } else if actual != expected {
            let error = Error::ArityMismatch {
                name: name(),
                expected,
                actual,
            };
            self.report(callee.position, error);
        }

        match site {
            CallSite::Expression if ret != SimpleType::Void => Some(ret),
            _ => None,
        }
    }

    fn check_param(&mut self, param: &Param) -> Option<SimpleType> {
        let ty = match &param.kind {
            ParamKind::Expr(expr) => self.check_expr(expr),
            ParamKind::Var(ident) => match self.resolution.get(ident.id)? {
                DeclRef::Var(id) => self.types.get(id),
                _ => {
                    self.report(ident.position, not_a_variable(ident));
                    None
                }
            },
            ParamKind::Blank | ParamKind::Error => None,
        };
        if let Some(ty) = ty {
            self.types.set(param.id, ty);
        }
        ty
    }

    fn report(&mut self, position: Position, error: Error) {
        self.reporter.report(position, error);
    }
}

fn not_a_variable(ident: &Ident) -> Error {
    Error::NotAVariable {
        name: ident.spelling.clone(),
    }
}
