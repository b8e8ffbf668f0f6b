//! Allocation-site passes: `make` containers and sized `make`/`new` calls.
//!
//! The `make` pass runs on syntax alone, so a builtin is recognized by name
//! unless resolution shows the name is shadowed.

use tracing::trace;

use super::FileWalker;
use crate::db::{MakeSite, SizedAllocSite};
use crate::error::Result;
use crate::syntax::visit::{walk_expr, walk_file};
use crate::syntax::{ChanDir, Expr, ExprNode, LitKind, ObjectKind, TypeTable, Visitor};
use crate::types::ContainerKind;

/// Value stored when a capacity or size is not statically known.
const UNKNOWN_SIZE: i64 = -1;

/// Parse a Go integer literal: decimal, `0x`, `0o`, `0b`, legacy leading-zero
/// octal, with optional `_` separators.
#[must_use]
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = digits.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = digits.strip_prefix("0b") {
        (2, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };
    i64::from_str_radix(body, radix).ok()
}

/// Render a type expression the way it is written in source.
///
/// Forms with no compact spelling fall back to the resolved type's name.
#[must_use]
pub fn render_type_expr(expr: &Expr, types: &TypeTable) -> String {
    let render = |e: &Expr| render_type_expr(e, types);
    match &expr.node {
        ExprNode::Ident { name, .. } => name.clone(),
        ExprNode::BasicLit { value, .. } => value.clone(),
        ExprNode::Selector { x, sel } => format!("{}.{}", render(x), sel.name),
        ExprNode::Star { x } => format!("*{}", render(x)),
        ExprNode::Paren { x } => format!("({})", render(x)),
        ExprNode::Ellipsis { elt: Some(elt) } => format!("...{}", render(elt)),
        ExprNode::ArrayType { len: None, elt } => format!("[]{}", render(elt)),
        ExprNode::ArrayType { len: Some(len), elt } => {
            format!("[{}]{}", render(len), render(elt))
        }
        ExprNode::MapType { key, value } => format!("map[{}]{}", render(key), render(value)),
        ExprNode::ChanType { dir, value } => match dir {
            ChanDir::Both => format!("chan {}", render(value)),
            ChanDir::Send => format!("chan<- {}", render(value)),
            ChanDir::Recv => format!("<-chan {}", render(value)),
        },
        ExprNode::Index { x, index } => format!("{}[{}]", render(x), render(index)),
        ExprNode::IndexList { x, indices } => {
            let args: Vec<String> = indices.iter().map(render).collect();
            format!("{}[{}]", render(x), args.join(", "))
        }
        ExprNode::StructType { fields } if fields.fields.is_empty() => "struct{}".to_string(),
        ExprNode::InterfaceType { methods } if methods.fields.is_empty() => {
            "interface{}".to_string()
        }
        _ => expr
            .ty
            .and_then(|r| types.name(r))
            .map_or_else(|| "?".to_string(), str::to_string),
    }
}

/// Integer value of a literal argument.
fn int_literal(expr: &Expr) -> Option<i64> {
    match &expr.unparen().node {
        ExprNode::BasicLit {
            kind: LitKind::Int,
            value,
        } => parse_int_literal(value),
        _ => None,
    }
}

/// The capacity argument of `make(T, len)` or `make(T, len, cap)`.
fn capacity_arg(args: &[Expr]) -> Option<&Expr> {
    match args.len() {
        2 => args.get(1),
        3 => args.get(2),
        _ => None,
    }
}

impl FileWalker<'_> {
    /// Whether `fun` names the builtin `name`.
    ///
    /// Without resolution every identifier called `make` counts.
    fn is_builtin(&self, fun: &Expr, name: &str) -> bool {
        match &fun.unparen().node {
            ExprNode::Ident { name: n, obj } if n == name => self
                .object(*obj)
                .is_none_or(|o| o.kind == ObjectKind::Builtin),
            _ => false,
        }
    }
}

/// Records `make` calls building slices, maps and channels.
pub(crate) struct MakeSites<'a> {
    w: FileWalker<'a>,
}

impl<'a> MakeSites<'a> {
    pub(crate) fn new(w: FileWalker<'a>) -> Self {
        Self { w }
    }

    pub(crate) fn run(mut self) -> Result<()> {
        let file = self.w.file;
        walk_file(&mut self, file)
    }
}

impl Visitor for MakeSites<'_> {
    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        let ExprNode::Call { fun, args, .. } = &expr.node else {
            return walk_expr(self, expr);
        };
        if !self.w.is_builtin(fun, "make") {
            return walk_expr(self, expr);
        }
        let container = match args.first().map(|a| &a.unparen().node) {
            Some(ExprNode::ArrayType { len: None, .. }) => ContainerKind::Slice,
            Some(ExprNode::MapType { .. }) => ContainerKind::Map,
            Some(ExprNode::ChanType { .. }) => ContainerKind::Chan,
            _ => return Ok(()),
        };
        let site = MakeSite {
            file: self.w.file_id,
            position: expr.span.start(),
            container,
            capacity: capacity_arg(args)
                .and_then(int_literal)
                .unwrap_or(UNKNOWN_SIZE),
        };
        if self.w.session.insert_make_site(&site)? {
            trace!(
                line = site.position.line,
                column = site.position.column,
                container = %site.container,
                capacity = site.capacity,
                "Recorded make site"
            );
        }
        Ok(())
    }
}

/// Records `make([]T, ...)` and `new(T)` with their byte sizes.
pub(crate) struct SizedAllocs<'a> {
    w: FileWalker<'a>,
}

impl<'a> SizedAllocs<'a> {
    pub(crate) fn new(w: FileWalker<'a>) -> Self {
        Self { w }
    }

    pub(crate) fn run(mut self) -> Result<()> {
        let file = self.w.file;
        walk_file(&mut self, file)
    }

    fn make_slice(&self, args: &[Expr]) -> Option<(String, i64)> {
        let ExprNode::ArrayType { len: None, elt } = &args.first()?.unparen().node else {
            return None;
        };
        let types = &self.w.unit.types;
        let element = elt.ty.and_then(|r| types.size_of(r));
        let count = capacity_arg(args).and_then(int_literal);
        let size = match (element, count) {
            (Some(element), Some(count)) => element.checked_mul(count).unwrap_or(UNKNOWN_SIZE),
            _ => UNKNOWN_SIZE,
        };
        Some((render_type_expr(elt, types), size))
    }

    fn new_value(&self, args: &[Expr]) -> Option<(String, i64)> {
        let [ty] = args else {
            return None;
        };
        let types = &self.w.unit.types;
        let size = ty
            .ty
            .and_then(|r| types.size_of(r))
            .unwrap_or(UNKNOWN_SIZE);
        Some((render_type_expr(ty, types), size))
    }
}

impl Visitor for SizedAllocs<'_> {
    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        let ExprNode::Call { fun, args, .. } = &expr.node else {
            return walk_expr(self, expr);
        };
        let (builtin, found) = if self.w.is_builtin(fun, "make") {
            ("make", self.make_slice(args))
        } else if self.w.is_builtin(fun, "new") {
            ("new", self.new_value(args))
        } else {
            return walk_expr(self, expr);
        };
        let Some((type_name, size)) = found else {
            return Ok(());
        };
        let site = SizedAllocSite {
            file: self.w.file_id,
            position: expr.span.start(),
            builtin,
            type_name,
            size,
        };
        if self.w.session.insert_sized_alloc_site(&site)? {
            trace!(
                line = site.position.line,
                column = site.position.column,
                builtin,
                type_name = %site.type_name,
                size,
                "Recorded sized allocation"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Field, FieldList, Ident, TypeData};
    use crate::types::Span;
    use rstest::rstest;

    #[rstest]
    #[case("0", Some(0))]
    #[case("42", Some(42))]
    #[case("1_000", Some(1000))]
    #[case("0x1F", Some(31))]
    #[case("0X_ff", Some(255))]
    #[case("0o17", Some(15))]
    #[case("017", Some(15))]
    #[case("0b101", Some(5))]
    #[case("08", None)]
    #[case("0x", None)]
    #[case("n", None)]
    fn int_literals(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_int_literal(text), expected);
    }

    fn span() -> Span {
        Span::new(1, 1, 1, 2).expect("valid span")
    }

    fn node(node: ExprNode) -> Expr {
        Expr {
            span: span(),
            ty: None,
            node,
        }
    }

    fn ident(name: &str) -> Expr {
        node(ExprNode::Ident {
            name: name.into(),
            obj: None,
        })
    }

    #[test]
    fn renders_composite_type_expressions() {
        let types = TypeTable::new();
        let ty = node(ExprNode::MapType {
            key: Box::new(ident("string")),
            value: Box::new(node(ExprNode::ArrayType {
                len: None,
                elt: Box::new(node(ExprNode::Star {
                    x: Box::new(node(ExprNode::Selector {
                        x: Box::new(ident("http")),
                        sel: Ident {
                            name: "Request".into(),
                            span: span(),
                            ty: None,
                            obj: None,
                        },
                    })),
                })),
            })),
        });

        assert_eq!(render_type_expr(&ty, &types), "map[string][]*http.Request");
    }

    #[test]
    fn renders_channel_directions() {
        let types = TypeTable::new();
        let recv = node(ExprNode::ChanType {
            dir: ChanDir::Recv,
            value: Box::new(ident("int")),
        });
        assert_eq!(render_type_expr(&recv, &types), "<-chan int");
    }

    #[test]
    fn unrenderable_forms_use_the_resolved_name() {
        let mut types = TypeTable::new();
        let r = types.push("struct{x int}", TypeData::Struct { fields: Vec::new() });
        let mut ty = node(ExprNode::StructType {
            fields: FieldList {
                span: None,
                fields: vec![Field {
                    span: span(),
                    names: Vec::new(),
                    ty: ident("int"),
                    tag: None,
                }],
            },
        });
        ty.ty = Some(r);

        assert_eq!(render_type_expr(&ty, &types), "struct{x int}");
    }

    #[test]
    fn capacity_is_the_last_size_argument() {
        let lit = |v: &str| {
            node(ExprNode::BasicLit {
                kind: LitKind::Int,
                value: v.into(),
            })
        };
        let ty = ident("T");
        assert_eq!(capacity_arg(&[ty.clone()]).and_then(int_literal), None);
        assert_eq!(
            capacity_arg(&[ty.clone(), lit("4")]).and_then(int_literal),
            Some(4)
        );
        assert_eq!(
            capacity_arg(&[ty.clone(), lit("4"), lit("0x10")]).and_then(int_literal),
            Some(16)
        );
        assert_eq!(
            capacity_arg(&[ty, lit("4"), ident("n")]).and_then(int_literal),
            None
        );
    }
}
