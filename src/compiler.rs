//! The compilation pipeline: lexing, parsing, resolution, type checking and
//! code generation, in that order.
//!
//! Each stage visits the whole input, reporting as many errors as it can. A
//! stage only runs if every previous one finished without errors.

use tracing::{debug, info};

use crate::{
    ast::Program,
    codegen::{self, target::TargetCode},
    diagnostics::{self, Reporter},
    lexer, parser,
    resolver::{self, Resolution},
    source::{CharSource, StrSource},
    token::{Located, Token},
    type_checker::{self, Types},
    util::fmt::tree::{self, Overlays},
};

/// Everything a compilation produced, up to the first stage that failed.
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub program: Option<Program>,
    pub resolution: Option<Resolution>,
    pub types: Option<Types>,
    pub code: Option<TargetCode>,
    pub reporter: Reporter,
}

impl Compilation {
    pub fn run(source: impl CharSource) -> Compilation {
        let mut c = Compilation {
            tokens: Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY),
            program: None,
            resolution: None,
            types: None,
            code: None,
            reporter: Reporter::new(),
        };
        c.lex(source);
        c.parse();
        c.resolve();
        c.check();
        c.generate();
        if c.reporter.has_errors() {
            info!("compilation failed with {} errors", c.reporter.len());
        }
        c
    }

    pub fn run_str(src: &str) -> Compilation {
        Compilation::run(StrSource::new(src))
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_some() && !self.reporter.has_errors()
    }

    /// Prints the syntax tree with whatever decorations were produced.
    pub fn tree(&self) -> Option<String> {
        let program = self.program.as_ref()?;
        let overlays = Overlays {
            resolution: self.resolution.as_ref(),
            types: self.types.as_ref(),
        };
        Some(tree::print_program_string(program, overlays))
    }

    pub fn into_result(self) -> Result<TargetCode, Vec<Located<diagnostics::Error>>> {
        match self.code {
            Some(code) if !self.reporter.has_errors() => Ok(code),
            _ => Err(self.reporter.into_errors()),
        }
    }

    fn lex(&mut self, source: impl CharSource) {
        lexer::lex(source, &mut self.tokens, &mut self.reporter);
        debug!("lexed {} tokens", self.tokens.len());
    }

    fn parse(&mut self) {
        if self.should_stop("parsing") {
            return;
        }
        self.program = Some(parser::parse(&self.tokens, &mut self.reporter));
    }

    fn resolve(&mut self) {
        if self.should_stop("resolution") {
            return;
        }
        if let Some(program) = &self.program {
            self.resolution = Some(resolver::resolve(program, &mut self.reporter));
        }
    }

    fn check(&mut self) {
        if self.should_stop("type checking") {
            return;
        }
        if let (Some(program), Some(resolution)) = (&self.program, &self.resolution) {
            self.types = Some(type_checker::check(program, resolution, &mut self.reporter));
        }
    }

    fn generate(&mut self) {
        if self.should_stop("code generation") {
            return;
        }
        if let (Some(program), Some(resolution), Some(types)) =
            (&self.program, &self.resolution, &self.types)
        {
            let code = codegen::generate(program, resolution, types, &mut self.reporter);
            self.code = Some(code);
        }
    }

    fn should_stop(&self, stage: &str) -> bool {
        let stop = self.reporter.has_errors();
        if stop {
            debug!("skipping {stage}, {} errors so far", self.reporter.len());
        }
        stop
    }
}

/// Compiles the given source, returning its code or every reported error.
pub fn compile(src: &str) -> Result<TargetCode, Vec<Located<diagnostics::Error>>> {
    Compilation::run_str(src).into_result()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codegen::tam::OpCode;

    #[test]
    fn clean_programs_end_in_halt() {
        for src in [
            "",
            "putint(1)",
            include_str!("../demos/factorial.tri"),
            include_str!("../demos/big.tri"),
        ] {
            let code = compile(src).unwrap_or_else(|errors| panic!("{errors:?}"));
            assert!(!code.is_empty());
            assert_eq!(code.instructions().last().map(|i| i.op), Some(OpCode::HALT));
        }
    }

    #[test]
    fn if_jump_lands_after_the_then_branch() {
        let code = compile("if (1 < 2) then putint(1) endif").unwrap();
        let jumps: Vec<_> = code
            .instructions()
            .iter()
            .enumerate()
            .filter(|(_, i)| i.op == OpCode::JUMPIF)
            .collect();
        assert_eq!(jumps.len(), 1);
        let (at, jump) = jumps[0];
        // the then-branch is `LOADL 1; CALL PUTINT`
        assert_eq!(jump.operand, i16::try_from(at + 3).unwrap());
        assert_eq!(code.instructions()[at + 3].op, OpCode::HALT);
    }

    #[test]
    fn undeclared_names_skip_later_stages() {
        let c = Compilation::run_str("y := 1");
        assert_eq!(c.reporter.format(), ["1:1: `y` is not declared"]);
        assert!(c.program.is_some());
        assert!(c.resolution.is_some());
        assert!(c.types.is_none());
        assert!(c.code.is_none());
        assert!(!c.is_ok());
    }

    #[test]
    fn loop_variable_is_visible_in_its_bounds() {
        let c = Compilation::run_str("for i := 1 to i do putint(i) next");
        assert_eq!(c.reporter.format(), Vec::<String>::new());
        assert!(c.is_ok());
    }

    #[test]
    fn lexical_errors_skip_parsing() {
        let c = Compilation::run_str("x := 1 % 2");
        assert_eq!(c.reporter.format(), ["1:8: unknown input '%'"]);
        assert!(c.program.is_none());
        assert_eq!(c.tree(), None);
    }

    #[test]
    fn type_errors_skip_generation() {
        let errors = compile("if (1) then endif").unwrap_err();
        let errors: Vec<_> = errors.iter().map(|e| format!("{e:#}")).collect();
        assert_eq!(errors, ["1:5: condition must be Boolean, but got Integer"]);
    }

    #[test]
    fn tree_of_a_checked_program() {
        let c = Compilation::run_str("putint(7)");
        assert!(c.is_ok());
        assert_eq!(
            c.tree().as_deref(),
            Some("call putint (1:1) -> builtin putint\n  param (1:8) %: Integer\n    int 7 (1:8) %: Integer\n")
        );
    }
}
