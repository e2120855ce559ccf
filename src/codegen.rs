//! Code generation for the Triangle Abstract Machine.
//!
//! The whole program runs in a single stack frame: every declared entity is
//! addressed from [`tam::Register::SB`], and each `let` or `for` pops what it
//! pushed once its body is done.

pub mod entity;
pub mod interface;
pub mod scopes;
pub mod tam;
pub mod target;

use tracing::debug;

use crate::{
    ast::{
        Command, CommandKind, DeclKind, Declaration, Expr, ExprKind, Ident, NodeId, Param,
        ParamKind, Program,
    },
    codegen::{
        entity::RuntimeEntity,
        scopes::ScopeSizes,
        tam::{Primitive, FALSE, TRUE},
        target::{Address, Instruction, TargetCode},
    },
    diagnostics::Reporter,
    resolver::{DeclRef, Resolution},
    std_env::{StdDecl, StdKind},
    token::Position,
    type_checker::Types,
    types::SimpleType,
    util::table::NodeTable,
};

pub use interface::Format;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("program too large")]
    ProgramTooLarge,
    #[error("too much memory taken by local declarations")]
    ScopeTooLarge,
}

const UNCHECKED: &str = "code generation requires a resolved and checked program";

/// Operand of a jump that is yet to be patched.
const UNPATCHED: Address = Address::new(-1);

/// Generates code for a program that was resolved and checked without errors.
///
/// # Panics
///
/// If `resolution` or `types` lack a decoration the program needs.
pub fn generate(
    program: &Program,
    resolution: &Resolution,
    types: &Types,
    reporter: &mut Reporter,
) -> TargetCode {
    Generator::new(resolution, types, reporter).generate(program)
}

pub struct Generator<'a, 'rep> {
    resolution: &'a Resolution,
    types: &'a Types,
    reporter: &'rep mut Reporter,
    code: TargetCode,
    scopes: ScopeSizes,
    entities: NodeTable<RuntimeEntity>,
    /// Position of the command being generated.
    position: Position,
    /// Once the code buffer fills up nothing else is emitted.
    overflowed: bool,
}

impl<'a, 'rep> Generator<'a, 'rep> {
    pub fn new(
        resolution: &'a Resolution,
        types: &'a Types,
        reporter: &'rep mut Reporter,
    ) -> Generator<'a, 'rep> {
        Generator {
            resolution,
            types,
            reporter,
            code: TargetCode::new(),
            scopes: ScopeSizes::new(),
            entities: NodeTable::new(0),
            position: Position::new(1, 1),
            overflowed: false,
        }
    }

    /// Emits into the given buffer rather than a fresh one.
    pub fn with_code(mut self, code: TargetCode) -> Generator<'a, 'rep> {
        self.code = code;
        self
    }

    pub fn generate(mut self, program: &Program) -> TargetCode {
        debug!("generating code");
        self.entities = NodeTable::new(program.node_count);
        self.g_command(&program.command);
        self.emit(Instruction::halt());
        debug!("generated {} instructions", self.code.len());
        self.code
    }
}

impl Generator<'_, '_> {
    fn g_command(&mut self, command: &Command) {
        self.position = command.position;
        match &command.kind {
            CommandKind::Assign { target, value } => {
                self.g_expr(value);
                let store = self.variable(target).store().expect("variables can be stored to");
                self.emit(store);
            }
            CommandKind::Call { callee, param } => {
                self.g_param(param);
                self.g_call(callee.id);
            }
            CommandKind::If {
                condition,
                then_branch,
            } => {
                self.g_expr(condition);
                let skip_then = self.emit(Instruction::jump_if(FALSE, UNPATCHED));
                self.g_command(then_branch);
                self.patch(skip_then);
            }
            CommandKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                self.g_expr(condition);
                let to_else = self.emit(Instruction::jump_if(FALSE, UNPATCHED));
                self.g_command(then_branch);
                let skip_else = self.emit(Instruction::jump(UNPATCHED));
                self.patch(to_else);
                self.g_command(else_branch);
                self.patch(skip_else);
            }
            CommandKind::While { condition, body } => {
                let to_test = self.emit(Instruction::jump(UNPATCHED));
                let top = self.code.next_address();
                self.g_command(body);
                self.patch(to_test);
                self.g_expr(condition);
                self.emit(Instruction::jump_if(TRUE, top));
            }
            CommandKind::For {
                variable,
                start,
                bound,
                body,
            } => self.in_scope(|this| {
                let counter = this.declare_variable(variable.id, SimpleType::Integer);
                let store = counter.store().expect("variables can be stored to");
                this.g_expr(start);
                this.emit(store);

                let to_test = this.emit(Instruction::jump(UNPATCHED));
                let top = this.code.next_address();
                this.g_command(body);
                this.emit(counter.load());
                this.emit(Instruction::call(Primitive::SUCC));
                this.emit(store);

                this.patch(to_test);
                this.emit(counter.load());
                this.g_expr(bound);
                this.emit(Instruction::call(Primitive::LE));
                this.emit(Instruction::jump_if(TRUE, top));
            }),
            CommandKind::Let { declaration, body } => self.in_scope(|this| {
                this.g_declaration(declaration);
                this.g_command(body);
            }),
            CommandKind::Sequential(commands) => {
                for command in commands {
                    self.g_command(command);
                }
            }
            CommandKind::Blank => {}
            CommandKind::Error => unreachable!("{UNCHECKED}"),
        }
    }

    fn g_declaration(&mut self, declaration: &Declaration) {
        match &declaration.kind {
            DeclKind::Const(decl) => {
                let known = match &decl.value.kind {
                    ExprKind::Int(literal) => literal.value(),
                    ExprKind::Char(literal) => literal.value(),
                    _ => None,
                };
                let entity = if let Some(value) = known {
                    RuntimeEntity::KnownConstant { value }
                } else {
                    self.g_expr(&decl.value);
                    let size = self.type_of(decl.id).size();
                    let offset = self.allocate(size);
                    RuntimeEntity::UnknownConstant { offset, size }
                };
                self.entities.set(decl.id, entity);
            }
            DeclKind::Var(decl) => {
                let ty = self.type_of(decl.id);
                self.declare_variable(decl.id, ty);
            }
            DeclKind::Sequential(declarations) => {
                for declaration in declarations {
                    self.g_declaration(declaration);
                }
            }
            DeclKind::Error => unreachable!("{UNCHECKED}"),
        }
    }

    fn g_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } => {
                self.g_expr(lhs);
                self.g_expr(rhs);
                self.g_call(op.id);
            }
            ExprKind::Unary { op, operand } => {
                self.g_expr(operand);
                self.g_call(op.id);
            }
            ExprKind::Char(literal) => {
                let value = literal.value().expect(UNCHECKED);
                self.emit(Instruction::load_literal(value));
            }
            ExprKind::Int(literal) => {
                let value = literal.value().expect(UNCHECKED);
                self.emit(Instruction::load_literal(value));
            }
            ExprKind::Id(ident) => {
                let load = match self.declaration(ident.id) {
                    DeclRef::Std(StdDecl {
                        kind: StdKind::Const { value, .. },
                        ..
                    }) => Instruction::load_literal(*value),
                    DeclRef::Const(id) | DeclRef::Var(id) => self.entity(id).load(),
                    DeclRef::Std(decl) => panic!("`{decl}` isn't a value"),
                };
                self.emit(load);
            }
            ExprKind::Call { callee, param } => {
                self.g_param(param);
                self.g_call(callee.id);
            }
            ExprKind::Error => unreachable!("{UNCHECKED}"),
        }
    }

    fn g_param(&mut self, param: &Param) {
        match &param.kind {
            ParamKind::Blank => {}
            ParamKind::Expr(expr) => self.g_expr(expr),
            ParamKind::Var(ident) => {
                let load = self.variable(ident).load_address().expect("variables have an address");
                self.emit(load);
            }
            ParamKind::Error => unreachable!("{UNCHECKED}"),
        }
    }

    /// Calls the primitive behind an operator or a built-in function.
    fn g_call(&mut self, id: NodeId) {
        let primitive = match self.declaration(id) {
            DeclRef::Std(StdDecl {
                kind:
                    StdKind::Function { primitive, .. }
                    | StdKind::Binary { primitive, .. }
                    | StdKind::Unary { primitive, .. },
                ..
            }) => *primitive,
            other => panic!("{other} isn't callable"),
        };
        self.emit(Instruction::call(primitive));
    }
}

/// Utility functions.
impl Generator<'_, '_> {
    fn emit(&mut self, instruction: Instruction) -> Option<Address> {
        if self.overflowed {
            return None;
        }
        match self.code.emit(instruction) {
            Ok(address) => Some(address),
            Err(error) => {
                self.overflowed = true;
                self.reporter.report(self.position, error);
                None
            }
        }
    }

    /// Patches a jump to land on the next address. Jumps that couldn't be
    /// emitted are ignored.
    fn patch(&mut self, at: Option<Address>) {
        if let Some(at) = at {
            self.code.patch(at);
        }
    }

    /// Runs `f` within a new scope, popping whatever it declared afterwards.
    fn in_scope(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.open();
        f(self);
        let size = self.scopes.local_size();
        self.emit(Instruction::pop(size));
        self.scopes.close();
    }

    fn allocate(&mut self, size: u8) -> i16 {
        match self.scopes.allocate(size) {
            Ok(offset) => offset,
            Err(error) => {
                self.reporter.report(self.position, error);
                self.scopes.total_size()
            }
        }
    }

    fn declare_variable(&mut self, id: NodeId, ty: SimpleType) -> RuntimeEntity {
        let size = ty.size();
        self.emit(Instruction::push(size));
        let offset = self.allocate(size);
        let entity = RuntimeEntity::Variable { offset, size };
        self.entities.set(id, entity);
        entity
    }

    fn declaration(&self, id: NodeId) -> DeclRef {
        self.resolution.get(id).expect(UNCHECKED)
    }

    fn type_of(&self, id: NodeId) -> SimpleType {
        self.types.get(id).expect(UNCHECKED)
    }

    fn entity(&self, id: NodeId) -> RuntimeEntity {
        *self.entities.get(id).expect("entities are generated before their uses")
    }

    fn variable(&self, ident: &Ident) -> RuntimeEntity {
        match self.declaration(ident.id) {
            DeclRef::Var(id) => self.entity(id),
            other => panic!("{other} isn't a variable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, resolver, type_checker, util::test_utils::tree_tests};

    #[test]
    fn program_too_large_is_reported_once() {
        let mut reporter = Reporter::new();
        let program = parser::parse_str("putint(1); putint(2)", &mut Vec::new(), &mut reporter);
        let resolution = resolver::resolve(&program, &mut reporter);
        let types = type_checker::check(&program, &resolution, &mut reporter);
        assert!(!reporter.has_errors());

        let code = Generator::new(&resolution, &types, &mut reporter)
            .with_code(TargetCode::with_limit(3))
            .generate(&program);
        assert_eq!(code.len(), 3);
        assert_eq!(reporter.format(), ["1:12: program too large"]);
    }

    tree_tests!(
        use codegen;

        fn test_let_pushes_and_pops() {
            let program = "let var x : Integer in begin x := 5; putint(x) end";
            let code_ok = "
                0: PUSH   1             (9 0 0 1)
                1: LOADL  5             (3 0 0 5)
                2: STORE  1 SB+0        (4 4 1 0)
                3: LOAD   1 SB+0        (0 4 1 0)
                4: CALL   PUTINT        (6 2 0 25)
                5: POP    0 1           (10 0 0 1)
                6: HALT                 (14 0 0 0)
            ";
        }

        fn test_if_jumps_past_then_branch() {
            let program = "if (1 < 2) then putint(1) endif";
            let code_ok = "
                0: LOADL  1             (3 0 0 1)
                1: LOADL  2             (3 0 0 2)
                2: CALL   LT            (6 2 0 12)
                3: JUMPIF FALSE CB+6    (13 0 0 6)
                4: LOADL  1             (3 0 0 1)
                5: CALL   PUTINT        (6 2 0 25)
                6: HALT                 (14 0 0 0)
            ";
        }

        fn test_if_else() {
            let program = "if (eof()) then puteol() else put('a') endif";
            let code_ok = "
                0: CALL   EOF           (6 2 0 19)
                1: JUMPIF FALSE CB+4    (13 0 0 4)
                2: CALL   PUTEOL        (6 2 0 23)
                3: JUMP   CB+6          (11 0 0 6)
                4: LOADL  97            (3 0 0 97)
                5: CALL   PUT           (6 2 0 21)
                6: HALT                 (14 0 0 0)
            ";
        }

        fn test_while_tests_after_the_body() {
            let program = "let var n : Integer in begin getint(var n); while (n > 0) do n := n - 1 end";
            let code_ok = "
                0: PUSH   1             (9 0 0 1)
                1: LOADA  SB+0          (1 4 0 0)
                2: CALL   GETINT        (6 2 0 24)
                3: JUMP   CB+8          (11 0 0 8)
                4: LOAD   1 SB+0        (0 4 1 0)
                5: LOADL  1             (3 0 0 1)
                6: CALL   SUB           (6 2 0 8)
                7: STORE  1 SB+0        (4 4 1 0)
                8: LOAD   1 SB+0        (0 4 1 0)
                9: LOADL  0             (3 0 0 0)
                10: CALL   GT            (6 2 0 15)
                11: JUMPIF TRUE CB+4     (13 0 1 4)
                12: POP    0 1           (10 0 0 1)
                13: HALT                 (14 0 0 0)
            ";
        }

        fn test_for_and_constants() {
            let program = "let const k ~ 3; const c ~ chr(65) in for i := 1 to k do put(c) next";
            let code_ok = "
                0: LOADL  65            (3 0 0 65)
                1: CALL   ID            (6 2 0 0)
                2: PUSH   1             (9 0 0 1)
                3: LOADL  1             (3 0 0 1)
                4: STORE  1 SB+1        (4 4 1 1)
                5: JUMP   CB+11         (11 0 0 11)
                6: LOAD   1 SB+0        (0 4 1 0)
                7: CALL   PUT           (6 2 0 21)
                8: LOAD   1 SB+1        (0 4 1 1)
                9: CALL   SUCC          (6 2 0 4)
                10: STORE  1 SB+1        (4 4 1 1)
                11: LOAD   1 SB+1        (0 4 1 1)
                12: LOADL  3             (3 0 0 3)
                13: CALL   LE            (6 2 0 13)
                14: JUMPIF TRUE CB+6     (13 0 1 6)
                15: POP    0 1           (10 0 0 1)
                16: POP    0 1           (10 0 0 1)
                17: HALT                 (14 0 0 0)
            ";
        }

        fn test_left_associative_operators() {
            let program = "putint(1 - 2 - 3)";
            let code_ok = "
                0: LOADL  1             (3 0 0 1)
                1: LOADL  2             (3 0 0 2)
                2: CALL   SUB           (6 2 0 8)
                3: LOADL  3             (3 0 0 3)
                4: CALL   SUB           (6 2 0 8)
                5: CALL   PUTINT        (6 2 0 25)
                6: HALT                 (14 0 0 0)
            ";
        }

        fn test_builtin_constants_and_unary_operators() {
            let program = "let var b : Boolean in b := !true = false";
            let code_ok = "
                0: PUSH   1             (9 0 0 1)
                1: LOADL  1             (3 0 0 1)
                2: CALL   NOT           (6 2 0 1)
                3: LOADL  0             (3 0 0 0)
                4: CALL   EQ            (6 2 0 16)
                5: STORE  1 SB+0        (4 4 1 0)
                6: POP    0 1           (10 0 0 1)
                7: HALT                 (14 0 0 0)
            ";
        }

        fn test_known_constants_take_no_memory() {
            let program = "let const k ~ 'k' in put(k)";
            let code_ok = "
                0: LOADL  107           (3 0 0 107)
                1: CALL   PUT           (6 2 0 21)
                2: POP    0 0           (10 0 0 0)
                3: HALT                 (14 0 0 0)
            ";
        }

        fn test_empty_program() {
            let program = "";
            let code_ok = "0: HALT                 (14 0 0 0)";
        }

        fn test_errors_stop_before_generation() {
            let program = "y := 1";
            let expected_errors = &["1:1: `y` is not declared"];
        }
    );
}
