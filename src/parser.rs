use tracing::{debug, trace};

use crate::{
    ast::{
        CharLiteral, Command, CommandKind, ConstDecl, DeclKind, Declaration, Expr, ExprKind, Ident,
        IntLiteral, LoopVar, NodeId, Operator, Param, ParamKind, Program, TypeDenoter, VarDecl,
    },
    diagnostics::Reporter,
    lexer,
    token::{Token, TokenKind},
};

type Result<T, E = ()> = std::result::Result<T, E>;

/// Parses a token stream, which must be terminated by
/// [`TokenKind::EndOfText`].
///
/// Syntax errors are reported and replaced by `Error` nodes, so a tree is
/// always produced.
pub fn parse(tokens: &[Token], reporter: &mut Reporter) -> Program {
    Parser::new(tokens, reporter).parse_program()
}

/// Lexes and parses the given source.
pub fn parse_str(src: &str, tokens: &mut Vec<Token>, reporter: &mut Reporter) -> Program {
    lexer::lex_str(src, tokens, reporter);
    parse(tokens, reporter)
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected token {expected:?}, but got {actual:?}")]
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("unexpected token {actual:?} in expression")]
    UnexpectedInExpression { actual: TokenKind },
    #[error("expected a declaration, but got {actual:?}")]
    UnexpectedInDeclaration { actual: TokenKind },
}

struct Parser<'tok, 'rep> {
    tokens: &'tok [Token],
    cursor: usize,
    next_id: u32,
    reporter: &'rep mut Reporter,
}

impl<'tok> Parser<'tok, '_> {
    fn parse_program(mut self) -> Program {
        debug!("parsing {} tokens", self.tokens.len());
        let command = self.parse_command();
        _ = self.consume(TokenKind::EndOfText);
        Program {
            command,
            node_count: self.next_id as usize,
        }
    }

    fn parse_command(&mut self) -> Command {
        let mut commands = vec![self.parse_single_command()];
        while self.take(TokenKind::Semicolon) {
            commands.push(self.parse_single_command());
        }
        if commands.len() == 1 {
            return commands.remove(0);
        }
        Command {
            position: commands[0].position,
            kind: CommandKind::Sequential(commands),
        }
    }

    fn parse_single_command(&mut self) -> Command {
        match self.single_command() {
            Ok(command) => command,
            Err(()) => Command::error(self.peek().position),
        }
    }

    fn single_command(&mut self) -> Result<Command> {
        let token = self.peek();
        trace!("parsing command at {}", token.position);
        let kind = match token.kind {
            TokenKind::Identifier => self.parse_assign_or_call()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::Let => self.parse_let()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Begin => {
                self.advance();
                let command = self.parse_command();
                self.consume(TokenKind::End)?;
                return Ok(command);
            }
            _ => CommandKind::Blank,
        };
        Ok(Command {
            kind,
            position: token.position,
        })
    }

    fn parse_assign_or_call(&mut self) -> Result<CommandKind> {
        let ident = self.parse_ident()?;
        if self.take(TokenKind::LeftBracket) {
            let param = self.parse_param();
            self.consume(TokenKind::RightBracket)?;
            Ok(CommandKind::Call {
                callee: ident,
                param,
            })
        } else {
            self.consume(TokenKind::Becomes)?;
            let value = self.parse_expr();
            Ok(CommandKind::Assign {
                target: ident,
                value,
            })
        }
    }

    fn parse_if(&mut self) -> Result<CommandKind> {
        self.consume(TokenKind::If)?;
        let condition = self.parse_condition()?;
        self.consume(TokenKind::Then)?;
        let then_branch = Box::new(self.parse_single_command());

        if self.take(TokenKind::Else) {
            let else_branch = Box::new(self.parse_single_command());
            self.consume(TokenKind::EndIf)?;
            Ok(CommandKind::IfElse {
                condition,
                then_branch,
                else_branch,
            })
        } else {
            self.consume(TokenKind::EndIf)?;
            Ok(CommandKind::If {
                condition,
                then_branch,
            })
        }
    }

    fn parse_while(&mut self) -> Result<CommandKind> {
        self.consume(TokenKind::While)?;
        let condition = self.parse_condition()?;
        self.consume(TokenKind::Do)?;
        let body = Box::new(self.parse_single_command());
        Ok(CommandKind::While { condition, body })
    }

    /// Parses `'(' expr ')'`.
    fn parse_condition(&mut self) -> Result<Expr> {
        self.consume(TokenKind::LeftBracket)?;
        let condition = self.parse_expr();
        self.consume(TokenKind::RightBracket)?;
        Ok(condition)
    }

    fn parse_let(&mut self) -> Result<CommandKind> {
        self.consume(TokenKind::Let)?;
        let declaration = Box::new(self.parse_declaration());
        self.consume(TokenKind::In)?;
        let body = Box::new(self.parse_single_command());
        Ok(CommandKind::Let { declaration, body })
    }

    fn parse_for(&mut self) -> Result<CommandKind> {
        self.consume(TokenKind::For)?;
        let name = self.parse_ident()?;
        let variable = LoopVar {
            id: self.next_id(),
            name,
        };
        self.consume(TokenKind::Becomes)?;
        let start = self.parse_expr();
        self.consume(TokenKind::To)?;
        let bound = self.parse_expr();
        self.consume(TokenKind::Do)?;
        let body = Box::new(self.parse_single_command());
        self.consume(TokenKind::Next)?;
        Ok(CommandKind::For {
            variable,
            start,
            bound,
            body,
        })
    }

    fn parse_declaration(&mut self) -> Declaration {
        let mut declarations = vec![self.parse_single_declaration()];
        while self.take(TokenKind::Semicolon) {
            declarations.push(self.parse_single_declaration());
        }
        if declarations.len() == 1 {
            return declarations.remove(0);
        }
        Declaration {
            position: declarations[0].position,
            kind: DeclKind::Sequential(declarations),
        }
    }

    fn parse_single_declaration(&mut self) -> Declaration {
        let token = self.peek();
        trace!("parsing declaration at {}", token.position);
        let kind = match token.kind {
            TokenKind::Const => self.parse_const_declaration(),
            TokenKind::Var => self.parse_var_declaration(),
            actual => {
                let error = Error::UnexpectedInDeclaration { actual };
                self.reporter.report(token.position, error);
                Err(())
            }
        };
        match kind {
            Ok(kind) => Declaration {
                kind,
                position: token.position,
            },
            Err(()) => Declaration::error(self.peek().position),
        }
    }

    fn parse_const_declaration(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::Const)?;
        let id = self.next_id();
        let name = self.parse_ident()?;
        self.consume(TokenKind::Is)?;
        let value = self.parse_expr();
        Ok(DeclKind::Const(ConstDecl { id, name, value }))
    }

    fn parse_var_declaration(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::Var)?;
        let id = self.next_id();
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_type_denoter()?;
        Ok(DeclKind::Var(VarDecl { id, name, ty }))
    }

    fn parse_type_denoter(&mut self) -> Result<TypeDenoter> {
        let id = self.next_id();
        let name = self.parse_ident()?;
        Ok(TypeDenoter { id, name })
    }

    fn parse_param(&mut self) -> Param {
        let position = self.peek().position;
        let id = self.next_id();
        let kind = match self.peek().kind {
            TokenKind::RightBracket => ParamKind::Blank,
            TokenKind::Var => {
                self.advance();
                match self.parse_ident() {
                    Ok(ident) => ParamKind::Var(ident),
                    Err(()) => ParamKind::Error,
                }
            }
            _ => ParamKind::Expr(self.parse_expr()),
        };
        Param { id, kind, position }
    }

    /// Binary operators chain from left to right, without precedence.
    fn parse_expr(&mut self) -> Expr {
        let mut lhs = self.parse_primary();
        while self.is(TokenKind::Operator) {
            let op = self.parse_operator();
            let rhs = self.parse_primary();
            lhs = Expr {
                id: self.next_id(),
                position: lhs.position,
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        lhs
    }

    fn parse_primary(&mut self) -> Expr {
        match self.primary() {
            Ok(expr) => expr,
            Err(()) => Expr {
                id: self.next_id(),
                kind: ExprKind::Error,
                position: self.peek().position,
            },
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek();
        let position = token.position;
        let kind = match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                ExprKind::Int(IntLiteral {
                    spelling: token.spelling.clone(),
                    position,
                })
            }
            TokenKind::CharLiteral => {
                self.advance();
                ExprKind::Char(CharLiteral {
                    spelling: token.spelling.clone(),
                    position,
                })
            }
            TokenKind::Identifier => {
                let ident = self.parse_ident()?;
                if self.take(TokenKind::LeftBracket) {
                    let param = Box::new(self.parse_param());
                    self.consume(TokenKind::RightBracket)?;
                    ExprKind::Call {
                        callee: ident,
                        param,
                    }
                } else {
                    ExprKind::Id(ident)
                }
            }
            TokenKind::Operator => {
                let op = self.parse_operator();
                let operand = Box::new(self.parse_primary());
                ExprKind::Unary { op, operand }
            }
            TokenKind::LeftBracket => {
                self.advance();
                let expr = self.parse_expr();
                self.consume(TokenKind::RightBracket)?;
                return Ok(expr);
            }
            actual => {
                let error = Error::UnexpectedInExpression { actual };
                self.reporter.report(position, error);
                return Err(());
            }
        };
        Ok(Expr {
            id: self.next_id(),
            kind,
            position,
        })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            id: self.next_id(),
            spelling: token.spelling.clone(),
            position: token.position,
        })
    }

    /// Must only be called on an [`TokenKind::Operator`] token.
    fn parse_operator(&mut self) -> Operator {
        let token = self.advance();
        debug_assert_eq!(token.kind, TokenKind::Operator);
        Operator {
            id: self.next_id(),
            spelling: token.spelling.clone(),
            position: token.position,
        }
    }
}

impl<'tok> Parser<'tok, '_> {
    fn new<'rep>(tokens: &'tok [Token], reporter: &'rep mut Reporter) -> Parser<'tok, 'rep> {
        assert!(
            tokens.last().is_some_and(Token::is_eof),
            "token stream must be terminated by EndOfText"
        );
        Parser {
            tokens,
            cursor: 0,
            next_id: 0,
            reporter,
        }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Returns the current token.
    fn peek(&self) -> &'tok Token {
        let tokens: &'tok [Token] = self.tokens;
        &tokens[self.cursor]
    }

    /// Returns the current token and advances. The cursor never moves past
    /// the terminating [`TokenKind::EndOfText`].
    fn advance(&mut self) -> &'tok Token {
        let current = self.peek();
        if self.cursor + 1 < self.tokens.len() {
            self.cursor += 1;
        }
        current
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not,
    /// reports an error and stays on the offending token.
    fn consume(&mut self, expect: TokenKind) -> Result<&'tok Token> {
        let c = self.peek();
        if c.kind == expect {
            Ok(self.advance())
        } else {
            let error = Error::Unexpected {
                actual: c.kind,
                expected: expect,
            };
            self.reporter.report(c.position, error);
            Err(())
        }
    }
}
