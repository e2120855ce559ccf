use std::fmt;

use tracing::debug;

use crate::{
    codegen, lexer, parser, resolver,
    token::{Located, Position},
    type_checker,
};

/// Any error a compilation stage may report.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lexer(#[from] lexer::Error),
    #[error(transparent)]
    Parser(#[from] parser::Error),
    #[error(transparent)]
    Resolver(#[from] resolver::Error),
    #[error(transparent)]
    Checker(#[from] type_checker::Error),
    #[error(transparent)]
    Codegen(#[from] codegen::Error),
}

/// The error sink shared by every stage of a compilation.
///
/// Stages never abort on a reported error. The pipeline driver inspects
/// [`Reporter::has_errors`] between stages.
#[derive(Default)]
pub struct Reporter {
    errors: Vec<Located<Error>>,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter {
            errors: Vec::with_capacity(8),
        }
    }

    pub fn report(&mut self, position: Position, error: impl Into<Error>) {
        let error = position.wrap(error.into());
        debug!("reported {error:#}");
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<Located<Error>> {
        self.errors
    }

    /// Formats every error as `line:column: message`.
    pub fn format(&self) -> Vec<String> {
        self.errors.iter().map(|e| format!("{e:#}")).collect()
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.format()).finish()
    }
}

impl fmt::Display for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{error:#}")?;
        }
        Ok(())
    }
}
