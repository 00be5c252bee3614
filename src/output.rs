//! Terminal output for diagnostics, trees, tokens and highlights

use crate::query::diagnostics::{Diagnostic, Severity};
use crate::query::fixes::Fix;
use crate::query::highlight::{HighlightClass, HighlightSpan, PAREN_COLOR_LEVELS};
use crate::query::lexer::{Token, TokenKind};
use crate::query::parser::QueryNode;
use std::io;
use std::path::Path;
use termcolor::{Color, ColorSpec, WriteColor};

fn severity_spec(severity: Severity) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match severity {
        Severity::Error => spec.set_fg(Some(Color::Red)).set_bold(true),
        Severity::Warning => spec.set_fg(Some(Color::Yellow)).set_bold(true),
        Severity::Info => spec.set_fg(Some(Color::Cyan)),
    };
    spec
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}

/// Print diagnostics in `path:line:col: severity[code]: message` form, each
/// followed by the offending line with the span marked
pub fn print_diagnostics<W: WriteColor>(
    out: &mut W,
    path: Option<&Path>,
    text: &str,
    diagnostics: &[Diagnostic],
) -> io::Result<()> {
    let lines: Vec<&str> = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();

    for d in diagnostics {
        if let Some(path) = path {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(out, "{}", path.display())?;
            out.reset()?;
            write!(out, ":")?;
        }
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}:{}", d.span.line, d.span.start_col + 1)?;
        out.reset()?;
        write!(out, ": ")?;

        out.set_color(&severity_spec(d.severity))?;
        write!(out, "{}[{}]", severity_label(d.severity), d.code())?;
        out.reset()?;
        writeln!(out, ": {}", d.message)?;

        if let Some(line) = lines.get(d.span.line - 1) {
            let start = d.span.start_col.min(line.len());
            let end = d.span.end_col.clamp(start, line.len());
            writeln!(out, "    {}", line)?;
            let pad = line[..start].chars().count();
            let width = line[start..end].chars().count().max(1);
            write!(out, "    {}", " ".repeat(pad))?;
            out.set_color(&severity_spec(d.severity))?;
            write!(out, "{}", "^".repeat(width))?;
            out.reset()?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Print the totals line of a check run
pub fn print_summary<W: WriteColor>(
    out: &mut W,
    files: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
) -> io::Result<()> {
    let spec = if errors > 0 {
        severity_spec(Severity::Error)
    } else if warnings > 0 {
        severity_spec(Severity::Warning)
    } else {
        ColorSpec::new().set_fg(Some(Color::Green)).clone()
    };
    out.set_color(&spec)?;
    writeln!(
        out,
        "{} file{} checked: {} error{}, {} warning{}, {} info",
        files,
        if files == 1 { "" } else { "s" },
        errors,
        if errors == 1 { "" } else { "s" },
        warnings,
        if warnings == 1 { "" } else { "s" },
        infos
    )?;
    out.reset()
}

fn node_spec(node: &QueryNode) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match node {
        QueryNode::Root { .. } => spec.set_bold(true),
        QueryNode::Group { .. } => spec.set_fg(Some(Color::Yellow)),
        QueryNode::Operator { .. } => spec.set_fg(Some(Color::Blue)).set_bold(true),
        QueryNode::Phrase { .. } => spec.set_fg(Some(Color::Green)),
        QueryNode::Wildcard { .. } => spec.set_fg(Some(Color::Magenta)),
        QueryNode::Error { .. } => spec.set_fg(Some(Color::Red)).set_bold(true),
        QueryNode::Warning { .. } => spec.set_fg(Some(Color::Yellow)).set_bold(true),
        QueryNode::Term { .. } => &mut spec,
    };
    spec
}

/// Print query trees with two-space indentation per level
pub fn print_tree<W: WriteColor>(out: &mut W, roots: &[QueryNode]) -> io::Result<()> {
    // Explicit stack: trees can nest as deep as the input does
    let mut stack: Vec<(&QueryNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        write!(out, "{}", "  ".repeat(depth))?;
        out.set_color(&node_spec(node))?;
        write!(out, "{}", node.label())?;
        out.reset()?;
        let span = node.span();
        writeln!(out, " [{}..{}]", span.start, span.end)?;

        stack.extend(node.children().iter().rev().map(|c| (c, depth + 1)));
    }
    Ok(())
}

/// Print one token per line
pub fn print_tokens<W: WriteColor>(out: &mut W, tokens: &[Token]) -> io::Result<()> {
    for token in tokens {
        let kind = match token.kind {
            TokenKind::Term => "term",
            TokenKind::Operator => "operator",
            TokenKind::Phrase => "phrase",
            TokenKind::Wildcard => "wildcard",
            TokenKind::GroupStart => "group-start",
            TokenKind::GroupEnd => "group-end",
        };
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{:>4}..{:<4}", token.start, token.end)?;
        out.reset()?;
        write!(out, " {:<12} {}", kind, token.text)?;
        if token.is_operator() {
            write!(out, " (precedence {})", token.precedence)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

const PAREN_COLORS: [Color; PAREN_COLOR_LEVELS] = [
    Color::Yellow,
    Color::Cyan,
    Color::Blue,
    Color::Green,
    Color::Ansi256(214),
    Color::Magenta,
];

fn highlight_spec(class: HighlightClass) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match class {
        HighlightClass::Operator => spec.set_fg(Some(Color::Blue)).set_bold(true),
        HighlightClass::SpecialFunction => spec.set_fg(Some(Color::Cyan)),
        HighlightClass::SpecialOperator => spec.set_fg(Some(Color::Yellow)),
        HighlightClass::SearchTerm => spec.set_fg(Some(Color::White)),
        HighlightClass::NoiseWord => spec.set_fg(Some(Color::Magenta)).set_dimmed(true),
        HighlightClass::Paren { depth } => spec
            .set_fg(Some(PAREN_COLORS[depth % PAREN_COLOR_LEVELS]))
            .set_bold(true),
        HighlightClass::Quote => spec.set_fg(Some(Color::Ansi256(187))),
        HighlightClass::UnmatchedParen | HighlightClass::UnmatchedQuote => spec
            .set_fg(Some(Color::Red))
            .set_bold(true)
            .set_underline(true),
    };
    spec
}

/// Print `text` coloured by `spans`. Where spans overlap the earlier one wins.
pub fn print_highlighted<W: WriteColor>(
    out: &mut W,
    text: &str,
    spans: &[HighlightSpan],
) -> io::Result<()> {
    let mut cursor = 0;
    for span in spans {
        if span.start < cursor || span.end > text.len() {
            continue;
        }
        write!(out, "{}", &text[cursor..span.start])?;
        out.set_color(&highlight_spec(span.class))?;
        write!(out, "{}", &text[span.start..span.end])?;
        out.reset()?;
        cursor = span.end;
    }
    writeln!(out, "{}", &text[cursor..])
}

/// Print fixes in application order, with a preview for auto-fixes
pub fn print_fixes<W: WriteColor>(out: &mut W, text: &str, fixes: &[Fix]) -> io::Result<()> {
    for (i, fix) in fixes.iter().enumerate() {
        write!(out, "{:>2}. ", i + 1)?;
        let mut spec = ColorSpec::new();
        if fix.auto_fixable {
            spec.set_fg(Some(Color::Green)).set_bold(true);
        } else {
            spec.set_fg(Some(Color::Yellow));
        }
        out.set_color(&spec)?;
        write!(out, "[{}]", fix.code)?;
        out.reset()?;
        write!(out, " {}", fix.description)?;
        if let Some(line) = fix.line_number {
            write!(out, " (line {})", line)?;
        }
        writeln!(out)?;

        if fix.auto_fixable {
            let preview = fix.apply(text);
            out.set_color(ColorSpec::new().set_dimmed(true))?;
            for line in preview.lines() {
                writeln!(out, "      {}", line)?;
            }
            out.reset()?;
        }
    }
    Ok(())
}
