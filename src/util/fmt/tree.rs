use std::{collections::HashMap, io::Write};

use crate::{
    ast::*,
    resolver::{DeclRef, Resolution},
    token::Position,
    type_checker::Types,
};

const INDENT_WIDTH: usize = 2;

/// Decorations to print next to the nodes. Missing overlays are skipped.
#[derive(Copy, Clone, Default)]
pub struct Overlays<'a> {
    pub resolution: Option<&'a Resolution>,
    pub types: Option<&'a Types>,
}

struct Context<'a> {
    overlays: Overlays<'a>,
    /// Name and position of every user declaration, for printing links.
    declarations: HashMap<NodeId, (&'a str, Position)>,
}

pub fn print_program_string(program: &Program, overlays: Overlays<'_>) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program, overlays).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program(
    w: &mut impl Write,
    program: &Program,
    overlays: Overlays<'_>,
) -> std::io::Result<()> {
    let mut cx = Context {
        overlays,
        declarations: HashMap::with_capacity(program.node_count / 4),
    };
    collect_command(&mut cx.declarations, &program.command);
    print_command(w, &cx, 0, &program.command)
}

fn print_command(
    w: &mut impl Write,
    cx: &Context<'_>,
    i: usize,
    command: &Command,
) -> std::io::Result<()> {
    let pos = command.position;
    sp(w, i)?;
    match &command.kind {
        CommandKind::Assign { target, value } => {
            writeln!(w, "assign ({pos})")?;
            sp(w, i + 1)?;
            write!(w, "ident {} ({})", target.spelling, target.position)?;
            link(w, cx, target.id)?;
            writeln!(w)?;
            print_expr(w, cx, i + 1, value)?;
        }
        CommandKind::Blank => writeln!(w, "blank ({pos})")?,
        CommandKind::Call { callee, param } => {
            write!(w, "call {} ({pos})", callee.spelling)?;
            link(w, cx, callee.id)?;
            writeln!(w)?;
            print_param(w, cx, i + 1, param)?;
        }
        CommandKind::If {
            condition,
            then_branch,
        } => {
            writeln!(w, "if ({pos})")?;
            print_expr(w, cx, i + 1, condition)?;
            print_command(w, cx, i + 1, then_branch)?;
        }
        CommandKind::IfElse {
            condition,
            then_branch,
            else_branch,
        } => {
            writeln!(w, "if-else ({pos})")?;
            print_expr(w, cx, i + 1, condition)?;
            print_command(w, cx, i + 1, then_branch)?;
            print_command(w, cx, i + 1, else_branch)?;
        }
        CommandKind::While { condition, body } => {
            writeln!(w, "while ({pos})")?;
            print_expr(w, cx, i + 1, condition)?;
            print_command(w, cx, i + 1, body)?;
        }
        CommandKind::For {
            variable,
            start,
            bound,
            body,
        } => {
            writeln!(w, "for ({pos})")?;
            sp(w, i + 1)?;
            write!(w, "var {} ({})", variable.name.spelling, variable.name.position)?;
            ty(w, cx, variable.id)?;
            writeln!(w)?;
            print_expr(w, cx, i + 1, start)?;
            print_expr(w, cx, i + 1, bound)?;
            print_command(w, cx, i + 1, body)?;
        }
        CommandKind::Let { declaration, body } => {
            writeln!(w, "let ({pos})")?;
            print_declaration(w, cx, i + 1, declaration)?;
            print_command(w, cx, i + 1, body)?;
        }
        CommandKind::Sequential(commands) => {
            writeln!(w, "sequential ({pos})")?;
            for command in commands {
                print_command(w, cx, i + 1, command)?;
            }
        }
        CommandKind::Error => writeln!(w, "error ({pos})")?,
    }
    Ok(())
}

fn print_declaration(
    w: &mut impl Write,
    cx: &Context<'_>,
    i: usize,
    declaration: &Declaration,
) -> std::io::Result<()> {
    let pos = declaration.position;
    sp(w, i)?;
    match &declaration.kind {
        DeclKind::Const(decl) => {
            write!(w, "const {} ({pos})", decl.name.spelling)?;
            ty(w, cx, decl.id)?;
            writeln!(w)?;
            print_expr(w, cx, i + 1, &decl.value)?;
        }
        DeclKind::Var(decl) => {
            write!(w, "var {} ({pos})", decl.name.spelling)?;
            ty(w, cx, decl.id)?;
            writeln!(w)?;
            let name = &decl.ty.name;
            sp(w, i + 1)?;
            write!(w, "type {} ({})", name.spelling, name.position)?;
            link(w, cx, name.id)?;
            ty(w, cx, decl.ty.id)?;
            writeln!(w)?;
        }
        DeclKind::Sequential(declarations) => {
            writeln!(w, "sequential ({pos})")?;
            for declaration in declarations {
                print_declaration(w, cx, i + 1, declaration)?;
            }
        }
        DeclKind::Error => writeln!(w, "error ({pos})")?,
    }
    Ok(())
}

fn print_expr(w: &mut impl Write, cx: &Context<'_>, i: usize, expr: &Expr) -> std::io::Result<()> {
    let pos = expr.position;
    sp(w, i)?;
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } => {
            write!(w, "binary {} ({pos})", op.spelling)?;
            link(w, cx, op.id)?;
            ty(w, cx, expr.id)?;
            writeln!(w)?;
            print_expr(w, cx, i + 1, lhs)?;
            print_expr(w, cx, i + 1, rhs)?;
        }
        ExprKind::Unary { op, operand } => {
            write!(w, "unary {} ({pos})", op.spelling)?;
            link(w, cx, op.id)?;
            ty(w, cx, expr.id)?;
            writeln!(w)?;
            print_expr(w, cx, i + 1, operand)?;
        }
        ExprKind::Char(literal) => {
            write!(w, "char {} ({pos})", literal.spelling)?;
            ty(w, cx, expr.id)?;
            writeln!(w)?;
        }
        ExprKind::Int(literal) => {
            write!(w, "int {} ({pos})", literal.spelling)?;
            ty(w, cx, expr.id)?;
            writeln!(w)?;
        }
        ExprKind::Id(ident) => {
            write!(w, "ident {} ({pos})", ident.spelling)?;
            link(w, cx, ident.id)?;
            ty(w, cx, expr.id)?;
            writeln!(w)?;
        }
        ExprKind::Call { callee, param } => {
            write!(w, "call {} ({pos})", callee.spelling)?;
            link(w, cx, callee.id)?;
            ty(w, cx, expr.id)?;
            writeln!(w)?;
            print_param(w, cx, i + 1, param)?;
        }
        ExprKind::Error => writeln!(w, "error ({pos})")?,
    }
    Ok(())
}

fn print_param(w: &mut impl Write, cx: &Context<'_>, i: usize, param: &Param) -> std::io::Result<()> {
    let pos = param.position;
    sp(w, i)?;
    match &param.kind {
        ParamKind::Blank => writeln!(w, "blank-param ({pos})")?,
        ParamKind::Expr(expr) => {
            write!(w, "param ({pos})")?;
            ty(w, cx, param.id)?;
            writeln!(w)?;
            print_expr(w, cx, i + 1, expr)?;
        }
        ParamKind::Var(ident) => {
            write!(w, "var-param {} ({pos})", ident.spelling)?;
            link(w, cx, ident.id)?;
            ty(w, cx, param.id)?;
            writeln!(w)?;
        }
        ParamKind::Error => writeln!(w, "error ({pos})")?,
    }
    Ok(())
}

/// Writes ` -> DECLARATION` if the node is linked.
fn link(w: &mut impl Write, cx: &Context<'_>, id: NodeId) -> std::io::Result<()> {
    let Some(decl) = cx.overlays.resolution.and_then(|r| r.get(id)) else {
        return Ok(());
    };
    match decl {
        DeclRef::Std(decl) => write!(w, " -> builtin {decl}"),
        DeclRef::Const(id) | DeclRef::Var(id) => {
            let kind = if matches!(decl, DeclRef::Const(_)) { "const" } else { "var" };
            match cx.declarations.get(&id) {
                Some((name, pos)) => write!(w, " -> {kind} {name}@{pos}"),
                None => write!(w, " -> {decl}"),
            }
        }
    }
}

/// Writes ` %: TYPE` if the node is typed.
fn ty(w: &mut impl Write, cx: &Context<'_>, id: NodeId) -> std::io::Result<()> {
    match cx.overlays.types.and_then(|t| t.get(id)) {
        Some(t) => write!(w, " %: {t}"),
        None => Ok(()),
    }
}

fn collect_command<'a>(out: &mut HashMap<NodeId, (&'a str, Position)>, command: &'a Command) {
    match &command.kind {
        CommandKind::If { then_branch, .. } => collect_command(out, then_branch),
        CommandKind::IfElse {
            then_branch,
            else_branch,
            ..
        } => {
            collect_command(out, then_branch);
            collect_command(out, else_branch);
        }
        CommandKind::While { body, .. } => collect_command(out, body),
        CommandKind::For { variable, body, .. } => {
            let name = &variable.name;
            out.insert(variable.id, (&*name.spelling, name.position));
            collect_command(out, body);
        }
        CommandKind::Let { declaration, body } => {
            collect_declaration(out, declaration);
            collect_command(out, body);
        }
        CommandKind::Sequential(commands) => {
            for command in commands {
                collect_command(out, command);
            }
        }
        CommandKind::Assign { .. }
        | CommandKind::Blank
        | CommandKind::Call { .. }
        | CommandKind::Error => {}
    }
}

fn collect_declaration<'a>(
    out: &mut HashMap<NodeId, (&'a str, Position)>,
    declaration: &'a Declaration,
) {
    match &declaration.kind {
        DeclKind::Const(decl) => {
            out.insert(decl.id, (&*decl.name.spelling, declaration.position));
        }
        DeclKind::Var(decl) => {
            out.insert(decl.id, (&*decl.name.spelling, declaration.position));
        }
        DeclKind::Sequential(declarations) => {
            for declaration in declarations {
                collect_declaration(out, declaration);
            }
        }
        DeclKind::Error => {}
    }
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
