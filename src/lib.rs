/// The lexer takes a character source, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The resolver links every identifier and operator of an AST to its
/// declaration.
pub mod resolver;

/// The type checker computes the type of every expression of a resolved AST,
/// checking the soundness of its commands.
pub mod type_checker;

/// The code generator maps a checked AST into Triangle Abstract Machine code.
pub mod codegen;

pub mod compiler;

pub mod ast;
pub mod diagnostics;
pub mod source;
pub mod std_env;
pub mod symbol_table;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt {
        pub mod tree;
    }
    pub mod table;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
