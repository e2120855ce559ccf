use std::fmt;

use tracing::debug;

use crate::{
    ast::{
        Command, CommandKind, DeclKind, Declaration, Expr, ExprKind, Ident, NodeId, Operator,
        Param, ParamKind, Program,
    },
    diagnostics::Reporter,
    std_env::{StdDecl, STD_ENV},
    symbol_table::SymbolTable,
    token::Position,
    util::table::NodeTable,
};

/// What an identifier or operator refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclRef {
    Std(&'static StdDecl),
    /// A `const` declaration, by the declaration's id.
    Const(NodeId),
    /// A `var` declaration or a loop variable, by the declaration's id.
    Var(NodeId),
}

impl fmt::Display for DeclRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclRef::Std(decl) => write!(f, "builtin {decl}"),
            DeclRef::Const(id) => write!(f, "const {id}"),
            DeclRef::Var(id) => write!(f, "var {id}"),
        }
    }
}

/// Links from identifier and operator nodes to their declarations.
pub struct Resolution {
    links: NodeTable<DeclRef>,
}

impl Resolution {
    pub fn new(node_count: usize) -> Resolution {
        Resolution {
            links: NodeTable::new(node_count),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<DeclRef> {
        self.links.get(id).copied()
    }

    /// # Panics
    ///
    /// If the node is already linked.
    pub fn link(&mut self, id: NodeId, decl: DeclRef) {
        self.links.set(id, decl);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("`{name}` is already declared in current scope")]
    DuplicateDeclaration { name: Box<str> },
    #[error("`{name}` is not declared")]
    Undeclared { name: Box<str> },
}

/// Links every identifier and operator of the program to its declaration.
///
/// Names that can't be resolved are reported and left unlinked.
pub fn resolve(program: &Program, reporter: &mut Reporter) -> Resolution {
    let mut resolution = Resolution::new(program.node_count);
    resolve_with(program, &mut resolution, reporter);
    resolution
}

/// Resolves into an existing overlay.
///
/// # Panics
///
/// If a node of the program is already linked in `resolution`; resolving the
/// same program twice into one overlay is a bug in the caller.
pub fn resolve_with(program: &Program, resolution: &mut Resolution, reporter: &mut Reporter) {
    debug!("resolving declarations");
    let mut table = SymbolTable::new();
    for (name, decl) in &STD_ENV {
        table
            .enter(name, DeclRef::Std(decl))
            .expect("standard environment names are unique");
    }
    let mut resolver = Resolver {
        table,
        resolution,
        reporter,
    };
    resolver.resolve_command(&program.command);
}

struct Resolver<'a, 'rep> {
    table: SymbolTable,
    resolution: &'a mut Resolution,
    reporter: &'rep mut Reporter,
}

impl Resolver<'_, '_> {
    fn resolve_command(&mut self, command: &Command) {
        match &command.kind {
            CommandKind::Assign { target, value } => {
                self.resolve_expr(value);
                self.resolve_ident(target);
            }
            CommandKind::Call { callee, param } => {
                self.resolve_param(param);
                self.resolve_ident(callee);
            }
            CommandKind::If {
                condition,
                then_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_command(then_branch);
            }
            CommandKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_command(then_branch);
                self.resolve_command(else_branch);
            }
            CommandKind::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_command(body);
            }
            CommandKind::For {
                variable,
                start,
                bound,
                body,
            } => self.in_scope(|this| {
                // The loop variable is already visible in its bounds.
                this.declare(&variable.name, DeclRef::Var(variable.id));
                this.resolve_expr(start);
                this.resolve_expr(bound);
                this.resolve_command(body);
            }),
            CommandKind::Let { declaration, body } => self.in_scope(|this| {
                this.resolve_declaration(declaration);
                this.resolve_command(body);
            }),
            CommandKind::Sequential(commands) => {
                for command in commands {
                    self.resolve_command(command);
                }
            }
            CommandKind::Blank | CommandKind::Error => {}
        }
    }

    fn resolve_declaration(&mut self, declaration: &Declaration) {
        match &declaration.kind {
            DeclKind::Const(decl) => {
                self.declare(&decl.name, DeclRef::Const(decl.id));
                self.resolve_expr(&decl.value);
            }
            DeclKind::Var(decl) => {
                self.declare(&decl.name, DeclRef::Var(decl.id));
                self.resolve_ident(&decl.ty.name);
            }
            DeclKind::Sequential(declarations) => {
                for declaration in declarations {
                    self.resolve_declaration(declaration);
                }
            }
            DeclKind::Error => {}
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } => {
                self.resolve_expr(lhs);
                self.resolve_operator(op);
                self.resolve_expr(rhs);
            }
            ExprKind::Unary { op, operand } => {
                self.resolve_operator(op);
                self.resolve_expr(operand);
            }
            ExprKind::Id(ident) => self.resolve_ident(ident),
            ExprKind::Call { callee, param } => {
                self.resolve_ident(callee);
                self.resolve_param(param);
            }
            ExprKind::Char(_) | ExprKind::Int(_) | ExprKind::Error => {}
        }
    }

    fn resolve_param(&mut self, param: &Param) {
        match &param.kind {
            ParamKind::Expr(expr) => self.resolve_expr(expr),
            ParamKind::Var(ident) => self.resolve_ident(ident),
            ParamKind::Blank | ParamKind::Error => {}
        }
    }

    fn resolve_ident(&mut self, ident: &Ident) {
        self.lookup(ident.id, &ident.spelling, ident.position);
    }

    fn resolve_operator(&mut self, op: &Operator) {
        self.lookup(op.id, &op.spelling, op.position);
    }
}

/// Utility functions.
impl Resolver<'_, '_> {
    fn lookup(&mut self, id: NodeId, name: &str, position: Position) {
        match self.table.retrieve(name) {
            Some(decl) => self.resolution.link(id, decl),
            None => {
                let error = Error::Undeclared { name: name.into() };
                self.reporter.report(position, error);
            }
        }
    }

    /// Enters a name into the current scope. A name already declared in this
    /// scope keeps its first declaration.
    fn declare(&mut self, name: &Ident, decl: DeclRef) {
        if self.table.enter(&name.spelling, decl).is_err() {
            let error = Error::DuplicateDeclaration {
                name: name.spelling.clone(),
            };
            self.reporter.report(name.position, error);
        }
    }

    /// Runs `f` within a new scope.
    fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.table.open_scope();
        let res = f(self);
        self.table.close_scope();
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, util::test_utils::tree_tests};

    #[test]
    #[should_panic = "already decorated"]
    fn resolving_twice_into_one_overlay_panics() {
        let mut reporter = Reporter::new();
        let program = parser::parse_str("putint(1)", &mut Vec::new(), &mut reporter);
        let mut resolution = resolve(&program, &mut reporter);
        assert!(!reporter.has_errors());
        resolve_with(&program, &mut resolution, &mut reporter);
    }

    #[test]
    fn fresh_overlays_are_independent() {
        let mut reporter = Reporter::new();
        let program = parser::parse_str("x := 1 + 2", &mut Vec::new(), &mut reporter);
        let first = resolve(&program, &mut reporter);
        let second = resolve(&program, &mut reporter);
        // `+` resolves, `x` doesn't
        assert_eq!((first.len(), second.len()), (1, 1));
        assert_eq!(reporter.len(), 2);
    }

    tree_tests!(
        use resolver;

        fn test_let_scope() {
            let program = "let var x : Integer in x := 5; putint(x)";
            let tree_error = "
                sequential (1:1)
                  let (1:1)
                    var x (1:5)
                      type Integer (1:13) -> builtin Integer
                    assign (1:24)
                      ident x (1:24) -> var x@1:5
                      int 5 (1:29)
                  call putint (1:32) -> builtin putint
                    param (1:39)
                      ident x (1:39)
            ";
            let expected_errors = &["1:39: `x` is not declared"];
        }

        fn test_shadowing() {
            let program = "let const c ~ 'a' in let const c ~ 1 in putint(c)";
            let tree_ok = "
                let (1:1)
                  const c (1:5)
                    char 'a' (1:15)
                  let (1:22)
                    const c (1:26)
                      int 1 (1:36)
                    call putint (1:41) -> builtin putint
                      param (1:48)
                        ident c (1:48) -> const c@1:26
            ";
        }

        fn test_duplicate_declaration() {
            let program = "let var x : Integer; var x : Char in x := 1";
            let tree_error = "
                let (1:1)
                  sequential (1:5)
                    var x (1:5)
                      type Integer (1:13) -> builtin Integer
                    var x (1:22)
                      type Char (1:30) -> builtin Char
                  assign (1:38)
                    ident x (1:38) -> var x@1:5
                    int 1 (1:43)
            ";
            let expected_errors = &["1:26: `x` is already declared in current scope"];
        }

        fn test_operators_and_builtin_constants() {
            let program = "if (!true = (1 < 2)) then puteol() endif";
            let tree_ok = "
                if (1:1)
                  binary = (1:5) -> builtin =
                    unary ! (1:5) -> builtin !
                      ident true (1:6) -> builtin true
                    binary < (1:14) -> builtin <
                      int 1 (1:14)
                      int 2 (1:18)
                  call puteol (1:27) -> builtin puteol
                    blank-param (1:34)
            ";
        }

        fn test_for_bounds_see_the_loop_variable() {
            let program = "let var i : Integer in for i := i to 3 do putint(i) next";
            let tree_ok = "
                let (1:1)
                  var i (1:5)
                    type Integer (1:13) -> builtin Integer
                  for (1:24)
                    var i (1:28)
                    ident i (1:33) -> var i@1:28
                    int 3 (1:38)
                    call putint (1:43) -> builtin putint
                      param (1:50)
                        ident i (1:50) -> var i@1:28
            ";
        }

        fn test_loop_variable_as_its_own_bound() {
            let program = "for i := 1 to i do putint(i) next";
            let tree_ok = "
                for (1:1)
                  var i (1:5)
                  int 1 (1:10)
                  ident i (1:15) -> var i@1:5
                  call putint (1:20) -> builtin putint
                    param (1:27)
                      ident i (1:27) -> var i@1:5
            ";
        }

        fn test_undeclared_names() {
            let program = "y := 1; z(var w)";
            let expected_errors = &[
                "1:1: `y` is not declared",
                "1:15: `w` is not declared",
                "1:9: `z` is not declared",
            ];
        }
    );
}
