use sqlparser::ast::{
    BinaryOperator, Expr, Ident, Query, Select, SelectItem, SetExpr, Statement, TableFactor,
    TableWithJoins, UnaryOperator,
};

use ndql_lib_core::key::NODE_VALUE_KEY;
use ndql_lib_core::row::is_builtin_key;
use ndql_lib_core::stream::Arity;
use ndql_lib_core::value::Ordering;
use ndql_lib_core::{Error, Key, Node, Result, StreamFunction, Value};

use crate::executor::Cancellation;

mod functions;

/// Compile one parsed statement into a stream function.
pub fn compile(statement: &Statement, cancel: &Cancellation) -> Result<StreamFunction> {
    Compiler::new(cancel.clone()).statement(statement)
}

/// The AST visitor. Dispatches on each supported node kind; everything else
/// is `NotImplemented`. Carries only the cancellation token, which flows
/// into generator templates.
struct Compiler {
    cancel: Cancellation,
}

impl Compiler {
    fn new(cancel: Cancellation) -> Self {
        Self { cancel }
    }

    fn statement(&self, statement: &Statement) -> Result<StreamFunction> {
        match statement {
            Statement::Query(query) => self.query(query),
            other => Err(not_implemented(format!("statement {other}"))),
        }
    }

    fn query(&self, query: &Query) -> Result<StreamFunction> {
        match query.body.as_ref() {
            SetExpr::Select(select) => self.select(select),
            other => Err(not_implemented(format!("query body {other}"))),
        }
    }

    /// `SELECT fields [FROM (SELECT …) [AS t]] [WHERE e]` compiles to the
    /// left-to-right pipe `from ; where ; fields`; absent clauses are
    /// skipped.
    fn select(&self, select: &Select) -> Result<StreamFunction> {
        let mut stages: Vec<StreamFunction> = Vec::new();
        if !select.from.is_empty() {
            stages.push(self.from(&select.from)?);
        }
        if let Some(filter) = &select.selection {
            stages.push(self.where_clause(filter)?);
        }
        stages.push(self.field_list(&select.projection)?);

        let mut stages = stages.into_iter();
        let first = stages.next().expect("projection stage always present");
        Ok(stages.fold(first, StreamFunction::then))
    }

    //
    // FROM (SELECT ...) [AS ...]
    //

    fn from(&self, from: &[TableWithJoins]) -> Result<StreamFunction> {
        let [table] = from else {
            return Err(not_implemented("joins in FROM"));
        };
        if !table.joins.is_empty() {
            return Err(not_implemented("joins in FROM"));
        }
        match &table.relation {
            TableFactor::Derived { subquery, alias, .. } => {
                let inner = self.query(subquery)?;
                let Some(alias) = alias else {
                    return Ok(inner);
                };
                let table_name = alias.name.value.clone();
                Ok(inner.then(StreamFunction::map(move |n: Node| {
                    let mut out = Node::new();
                    for (stored, value) in n.iter() {
                        let mut key = Key::from_storage(stored);
                        // builtin columns bypass the rewrite
                        if key.table.is_empty() && is_builtin_key(&key.column) {
                            out.set(stored, value.clone());
                            continue;
                        }
                        key.table = table_name.clone();
                        out.set(key.storage(), value.clone());
                    }
                    Ok(out)
                })))
            }
            other => Err(not_implemented(format!("FROM {other}"))),
        }
    }

    //
    // WHERE
    //

    fn where_clause(&self, filter: &Expr) -> Result<StreamFunction> {
        let predicate = self.expr(filter)?;
        if predicate.ret_arity() != Arity::Unary {
            return Err(Error::InvalidFunctionArity("WHERE ret should be unary".into()));
        }
        Ok(StreamFunction::map(move |n: Node| {
            let produced = predicate.call_one(n.clone())?;
            let Some((_, value)) = produced.first().and_then(Node::first) else {
                log::warn!("WHERE got no value");
                return Err(Error::Ignore);
            };
            match value.as_bool() {
                Ok(Value::Bool(true)) => Ok(n),
                Ok(_) => Err(Error::Ignore),
                Err(err) => {
                    log::warn!("WHERE got non-Bool value {}: {err}", value.display());
                    Err(Error::Ignore)
                }
            }
        }))
    }

    //
    // field list
    //

    fn field_list(&self, projection: &[SelectItem]) -> Result<StreamFunction> {
        let mut fields = Vec::with_capacity(projection.len());
        for item in projection {
            fields.push(self.select_item(item)?);
        }
        validate_single_variadic(&fields)?;

        if fields[0].ret_arity() == Arity::Variadic {
            return Ok(fields.remove(0));
        }
        Ok(StreamFunction::map(move |n: Node| {
            let mut out = Node::new();
            for (i, field) in fields.iter().enumerate() {
                let produced = field
                    .call_one(n.clone())
                    .map_err(|err| err.context(format!("field[{i}]")))?;
                for row in produced {
                    out.merge(&row);
                }
            }
            Ok(out)
        }))
    }

    fn select_item(&self, item: &SelectItem) -> Result<StreamFunction> {
        match item {
            SelectItem::Wildcard(_) => Ok(StreamFunction::identity()),
            SelectItem::UnnamedExpr(expr) => {
                let text = expr.to_string();
                let f = self.expr(expr)?;
                Ok(f.then(rename_keys(move |key: &str| {
                    if key == NODE_VALUE_KEY {
                        text.clone()
                    } else {
                        key.to_string()
                    }
                })))
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                let column = alias.value.clone();
                let f = self.expr(expr)?;
                Ok(f.then(rename_keys(move |stored: &str| {
                    let mut key = Key::from_storage(stored);
                    key.column = column.clone();
                    key.storage()
                })))
            }
            SelectItem::QualifiedWildcard(..) => Err(not_implemented("qualified wildcard")),
        }
    }

    //
    // expressions
    //

    fn expr(&self, expr: &Expr) -> Result<StreamFunction> {
        match expr {
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => self.case(operand.as_deref(), conditions, results, else_result.as_deref()),
            Expr::Function(function) => self.function_call(function),
            Expr::Value(value) => {
                let value = literal(value)?;
                Ok(container_fn("literal", move |_| Ok(value.clone())))
            }
            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let f = self.expr(expr)?;
                let low = self.literal_expr(low)?;
                let high = self.literal_expr(high)?;
                let negated = *negated;
                Ok(f.then(container_fn("between", move |v| {
                    let hit = v.between(&low, &high)?;
                    Ok(Value::Bool(hit != negated))
                })))
            }
            Expr::IsNull(inner) => self.is_null(inner, false),
            Expr::IsNotNull(inner) => self.is_null(inner, true),
            Expr::IsTrue(inner) => self.is_truth(inner, true, false),
            Expr::IsNotTrue(inner) => self.is_truth(inner, true, true),
            Expr::IsFalse(inner) => self.is_truth(inner, false, false),
            Expr::IsNotFalse(inner) => self.is_truth(inner, false, true),
            Expr::Nested(inner) => self.expr(inner),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let f = self.expr(expr)?;
                let list = list
                    .iter()
                    .map(|e| self.literal_expr(e))
                    .collect::<Result<Vec<_>>>()?;
                let negated = *negated;
                Ok(f.then(container_fn("in", move |v| {
                    Ok(Value::Bool(v.in_list(&list) != negated))
                })))
            }
            Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => {
                let f = self.expr(expr)?;
                let pattern = self.literal_expr(pattern)?;
                let negated = *negated;
                Ok(f.then(container_fn("like", move |v| {
                    let hit = v.like(&pattern)?;
                    if negated { hit.neg() } else { Ok(hit) }
                })))
            }
            Expr::RLike {
                negated,
                expr,
                pattern,
                ..
            } => {
                let f = self.expr(expr)?;
                let pattern = self.literal_expr(pattern)?;
                let negated = *negated;
                Ok(f.then(container_fn("regexp", move |v| {
                    let hit = v.regexp(&pattern)?;
                    if negated { hit.neg() } else { Ok(hit) }
                })))
            }
            Expr::BinaryOp { left, op, right } => self.binary_op(left, op, right),
            Expr::UnaryOp { op, expr } => self.unary_op(op, expr),
            Expr::Identifier(ident) => Ok(column_fn(Key::new("", ident.value.clone()))),
            Expr::CompoundIdentifier(parts) => match &parts[..] {
                [table, column] => Ok(column_fn(Key::new(
                    table.value.clone(),
                    column.value.clone(),
                ))),
                _ => Err(not_implemented(format!("identifier {}", join_idents(parts)))),
            },
            other => Err(not_implemented(format!("expression {other}"))),
        }
    }

    fn is_null(&self, inner: &Expr, negated: bool) -> Result<StreamFunction> {
        let f = self.expr(inner)?;
        Ok(f.then(container_fn("is_null", move |v| {
            Ok(Value::Bool(v.is_null() != negated))
        })))
    }

    fn is_truth(&self, inner: &Expr, want_true: bool, negated: bool) -> Result<StreamFunction> {
        let f = self.expr(inner)?;
        Ok(f.then(container_fn("is_truth", move |v| {
            let hit = if want_true { v.is_true() } else { v.is_false() };
            Ok(Value::Bool(hit != negated))
        })))
    }

    fn binary_op(&self, left: &Expr, op: &BinaryOperator, right: &Expr) -> Result<StreamFunction> {
        let f = self.expr(left)?;
        let g = self.expr(right)?;
        if f.ret_arity() != Arity::Unary || g.ret_arity() != Arity::Unary {
            return Err(Error::InvalidTree(
                "binary operation operands should be unary".into(),
            ));
        }
        let apply = binary_operation(op)?;
        Ok(StreamFunction::map(move |n: Node| {
            let l = f.call_one(n.clone())?;
            let r = g.call_one(n)?;
            let Some((_, lv)) = l.first().and_then(Node::first) else {
                return Err(Error::InvalidValue("no left value".into()));
            };
            let Some((_, rv)) = r.first().and_then(Node::first) else {
                return Err(Error::InvalidValue("no right value".into()));
            };
            Ok(value_container(apply(lv, rv)?))
        }))
    }

    fn unary_op(&self, op: &UnaryOperator, inner: &Expr) -> Result<StreamFunction> {
        let f = self.expr(inner)?;
        let apply: fn(&Value) -> Result<Value> = match op {
            // unary minus and NOT share the negation path
            UnaryOperator::Minus | UnaryOperator::Not => Value::neg,
            UnaryOperator::PGBitwiseNot => Value::bit_not,
            other => return Err(not_implemented(format!("unary operator {other}"))),
        };
        Ok(f.then(container_fn("unary", move |v| apply(&v))))
    }

    //
    // CASE
    //

    fn case(
        &self,
        operand: Option<&Expr>,
        conditions: &[Expr],
        results: &[Expr],
        else_result: Option<&Expr>,
    ) -> Result<StreamFunction> {
        let mut cases = Vec::with_capacity(conditions.len());
        for (i, (condition, result)) in conditions.iter().zip(results).enumerate() {
            let condition = self
                .unary_ret_expr(condition)
                .map_err(|err| err.context(format!("WHEN[{i}]")))?;
            let result = self
                .unary_ret_expr(result)
                .map_err(|err| err.context(format!("THEN[{i}]")))?;
            cases.push((condition, result));
        }
        let fallback = match else_result {
            Some(e) => self.unary_ret_expr(e).map_err(|err| err.context("ELSE"))?,
            None => container_fn("case_else", |_| Ok(Value::Null)),
        };

        let operand = match operand {
            Some(e) => Some(self.unary_ret_expr(e).map_err(|err| err.context("CASE value"))?),
            None => None,
        };

        Ok(StreamFunction::map(move |n: Node| {
            let subject = match &operand {
                Some(f) => {
                    let produced = f.call_one(n.clone())?;
                    let Some((_, v)) = produced.first().and_then(Node::first) else {
                        return Err(Error::InvalidValue("CASE value eval no value".into()));
                    };
                    Some(v.clone())
                }
                None => None,
            };
            for (condition, result) in &cases {
                let produced = match condition.call_one(n.clone()) {
                    Ok(rows) => rows,
                    Err(err) => {
                        log::warn!("CASE WHEN failed to eval: {err}");
                        continue;
                    }
                };
                let Some((_, when)) = produced.first().and_then(Node::first) else {
                    log::warn!("CASE WHEN produced no value");
                    continue;
                };
                let hit = match &subject {
                    Some(value) => match value.compare(when) {
                        Ordering::Equal => true,
                        Ordering::Unknown => {
                            log::warn!(
                                "CASE WHEN failed to compare {} with {}",
                                value.display(),
                                when.display()
                            );
                            continue;
                        }
                        _ => false,
                    },
                    None => when.is_true(),
                };
                if hit {
                    return Ok(result.call_one(n)?.remove(0));
                }
            }
            Ok(fallback.call_one(n)?.remove(0))
        }))
    }

    fn unary_ret_expr(&self, expr: &Expr) -> Result<StreamFunction> {
        let f = self.expr(expr)?;
        if f.ret_arity() != Arity::Unary {
            return Err(Error::InvalidFunctionArity("requires unary ret".into()));
        }
        Ok(f)
    }

    /// Literal positions (IN lists, BETWEEN bounds, patterns) accept only
    /// literal expressions, including a sign-wrapped numeric literal.
    fn literal_expr(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Value(v) => literal(v),
            Expr::Nested(inner) => self.literal_expr(inner),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => self.literal_expr(expr)?.neg(),
            other => Err(not_implemented(format!("want a literal, got {other}"))),
        }
    }
}

fn join_idents(parts: &[Ident]) -> String {
    use itertools::Itertools;
    parts.iter().map(|p| p.value.as_str()).join(".")
}

fn not_implemented(msg: impl AsRef<str>) -> Error {
    Error::NotImplemented(msg.as_ref().to_string())
}

/// A row holding a single unnamed expression result.
fn value_container(value: Value) -> Node {
    let mut n = Node::new();
    n.set(NODE_VALUE_KEY, value);
    n
}

/// Map the first value of the incoming container row through `f` into a
/// fresh container row.
fn container_fn(
    name: impl Into<String>,
    f: impl Fn(Value) -> Result<Value> + Send + Sync + 'static,
) -> StreamFunction {
    let name = name.into();
    StreamFunction::map(move |n: Node| {
        let Some((_, value)) = n.first() else {
            return Err(Error::InvalidValue(format!("{name}: no upstream value")));
        };
        let out = f(value.clone()).map_err(|err| err.context(name.as_str()))?;
        Ok(value_container(out))
    })
}

/// Column reference: a single-entry row via the key lookup rule; a missing
/// column yields an empty row.
fn column_fn(key: Key) -> StreamFunction {
    StreamFunction::map(move |n: Node| {
        let mut out = Node::new();
        if let Some((stored, value)) = key.lookup(&n) {
            out.set(stored, value);
        }
        Ok(out)
    })
}

/// Rewrite every key of the produced row.
fn rename_keys(rename: impl Fn(&str) -> String + Send + Sync + 'static) -> StreamFunction {
    StreamFunction::map(move |n: Node| {
        let mut out = Node::new();
        for (stored, value) in n.iter() {
            out.set(rename(stored), value.clone());
        }
        Ok(out)
    })
}

/// At most one field function may produce multiple rows, and then it must be
/// the only field.
fn validate_single_variadic(fields: &[StreamFunction]) -> Result<()> {
    if fields.is_empty() {
        return Err(Error::InvalidFunctionArity("no functions".into()));
    }
    let variadic = fields
        .iter()
        .filter(|f| f.ret_arity() == Arity::Variadic)
        .count();
    if variadic > 0 && fields.len() != 1 {
        return Err(Error::InvalidFunctionArity("multiple variadic ret".into()));
    }
    Ok(())
}

fn literal(value: &sqlparser::ast::Value) -> Result<Value> {
    use sqlparser::ast::Value as Ast;
    match value {
        Ast::Null => Ok(Value::Null),
        Ast::Boolean(b) => Ok(Value::Bool(*b)),
        Ast::Number(text, _) => {
            if text.contains(['.', 'e', 'E']) {
                text.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|err| Error::InvalidValue(format!("bad number {text}: {err}")))
            } else {
                match text.parse::<i64>() {
                    Ok(i) => Ok(Value::Int(i)),
                    Err(_) => text
                        .parse::<f64>()
                        .map(Value::Float)
                        .map_err(|err| Error::InvalidValue(format!("bad number {text}: {err}"))),
                }
            }
        }
        Ast::SingleQuotedString(s) | Ast::DoubleQuotedString(s) => Ok(Value::String(s.clone())),
        other => Err(not_implemented(format!("literal {other}"))),
    }
}

fn binary_operation(op: &BinaryOperator) -> Result<impl Fn(&Value, &Value) -> Result<Value>> {
    type Apply = fn(&Value, &Value) -> Result<Value>;
    let apply: Apply = match op {
        BinaryOperator::And => Value::logical_and,
        BinaryOperator::Or => Value::logical_or,
        BinaryOperator::Xor => Value::logical_xor,
        BinaryOperator::Plus => Value::add,
        BinaryOperator::Minus => Value::subtract,
        BinaryOperator::Multiply => Value::multiply,
        BinaryOperator::Divide => Value::divide,
        BinaryOperator::Modulo => Value::rem,
        BinaryOperator::PGBitwiseShiftLeft => Value::shift_left,
        BinaryOperator::PGBitwiseShiftRight => Value::shift_right,
        BinaryOperator::Gt => |a: &Value, b: &Value| {
            Ok(Value::Bool(a.compare(b) == Ordering::Greater))
        },
        BinaryOperator::Lt => |a: &Value, b: &Value| Ok(Value::Bool(a.compare(b) == Ordering::Less)),
        BinaryOperator::GtEq => |a: &Value, b: &Value| {
            Ok(Value::Bool(matches!(
                a.compare(b),
                Ordering::Greater | Ordering::Equal
            )))
        },
        BinaryOperator::LtEq => |a: &Value, b: &Value| {
            Ok(Value::Bool(matches!(
                a.compare(b),
                Ordering::Less | Ordering::Equal
            )))
        },
        BinaryOperator::Eq => |a: &Value, b: &Value| Ok(Value::Bool(a.compare(b) == Ordering::Equal)),
        BinaryOperator::NotEq => |a: &Value, b: &Value| {
            Ok(Value::Bool(!matches!(
                a.compare(b),
                Ordering::Equal | Ordering::Unknown
            )))
        },
        other => return Err(not_implemented(format!("binary operator {other}"))),
    };
    Ok(apply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecOptions;
    use crate::{executor, parser};

    fn compile_one(sql: &str) -> Result<StreamFunction> {
        let statements = parser::parse(sql)?;
        compile(&statements[0], &Cancellation::new())
    }

    fn run(sql: &str, input: Vec<Node>) -> Vec<Node> {
        let function = compile_one(sql).unwrap();
        let mut out = Vec::new();
        executor::run(input.into_iter(), &function, &ExecOptions::default(), &mut |n| {
            out.push(n)
        })
        .unwrap();
        out
    }

    fn row(pairs: &[(&str, Value)]) -> Node {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_where_filters_rows() {
        let got = run(
            "select * where k1 > 0",
            vec![row(&[("k1", Value::Int(1))]), row(&[("k1", Value::Int(0))])],
        );
        assert_eq!(got, vec![row(&[("k1", Value::Int(1))])]);
    }

    #[test]
    fn test_where_missing_column_drops_row() {
        let got = run("select * where k9 > 0", vec![row(&[("k1", Value::Int(1))])]);
        assert!(got.is_empty());
    }

    #[test]
    fn test_from_subselect_with_alias() {
        let got = run(
            "select t1.k1 as k10 from (select *) as t1",
            vec![row(&[("k1", Value::Int(1))])],
        );
        assert_eq!(got, vec![row(&[("t1___k10", Value::Int(1))])]);
    }

    #[test]
    fn test_from_alias_keeps_builtin_keys_bare() {
        let got = run(
            "select * from (select *) as t1",
            vec![row(&[("path", Value::String("p".into())), ("k1", Value::Int(1))])],
        );
        assert_eq!(
            got,
            vec![row(&[
                ("path", Value::String("p".into())),
                ("t1___k1", Value::Int(1)),
            ])]
        );
    }

    #[test]
    fn test_bare_column_resolves_across_tables() {
        let got = run(
            "select k1 from (select *) as t1",
            vec![row(&[("k1", Value::Int(7))])],
        );
        assert_eq!(got, vec![row(&[("t1___k1", Value::Int(7))])]);
    }

    #[test]
    fn test_case_without_operand() {
        let input = vec![row(&[("k1", Value::Int(-1))]), row(&[("k1", Value::Int(5))])];
        let got = run(
            "select case when k1 > 0 then 100 else 1000 end as k1",
            input,
        );
        assert_eq!(
            got,
            vec![
                row(&[("k1", Value::Int(1000))]),
                row(&[("k1", Value::Int(100))]),
            ]
        );
    }

    #[test]
    fn test_case_with_operand() {
        let input = vec![row(&[("k1", Value::Int(2))]), row(&[("k1", Value::Int(9))])];
        let got = run(
            "select case k1 when 2 then 'two' else 'other' end as w",
            input,
        );
        assert_eq!(
            got,
            vec![
                row(&[("w", Value::String("two".into()))]),
                row(&[("w", Value::String("other".into()))]),
            ]
        );
    }

    #[test]
    fn test_case_without_else_defaults_to_null() {
        let got = run(
            "select case when k1 > 0 then 1 end as w",
            vec![row(&[("k1", Value::Int(-1))])],
        );
        assert_eq!(got, vec![row(&[("w", Value::Null)])]);
    }

    #[test]
    fn test_string_functions_in_fields() {
        let got = run(
            "select substr(k1, 3, 3) as k1, substr_index(k1, '.', 2) as k2",
            vec![row(&[("k1", Value::String("str.i.ng".into()))])],
        );
        assert_eq!(
            got,
            vec![row(&[
                ("k1", Value::String("r.i".into())),
                ("k2", Value::String("str.i".into())),
            ])]
        );
    }

    #[test]
    fn test_control_functions() {
        let input = vec![
            row(&[("k1", Value::Int(1)), ("k2", Value::Int(2))]),
            row(&[("k1", Value::Int(0)), ("k2", Value::Null)]),
        ];
        let got = run(
            "select if(k1 > 0, 100, 10) as k1, ifnull(k2, 100) as k2, nullif(k1, 1) as k3",
            input,
        );
        assert_eq!(
            got,
            vec![
                row(&[
                    ("k1", Value::Int(100)),
                    ("k2", Value::Int(2)),
                    ("k3", Value::Null),
                ]),
                row(&[
                    ("k1", Value::Int(10)),
                    ("k2", Value::Int(100)),
                    ("k3", Value::Int(0)),
                ]),
            ]
        );
    }

    #[test]
    fn test_unnamed_field_uses_expression_text() {
        let got = run("select k1 + 1", vec![row(&[("k1", Value::Int(1))])]);
        assert_eq!(got.len(), 1);
        let (key, value) = got[0].first().unwrap();
        assert_eq!(key, "k1 + 1");
        assert_eq!(value, &Value::Int(2));
    }

    #[test]
    fn test_in_list() {
        let got = run(
            "select * where k1 in (1, 3)",
            vec![
                row(&[("k1", Value::Int(1))]),
                row(&[("k1", Value::Int(2))]),
                row(&[("k1", Value::Int(3))]),
            ],
        );
        assert_eq!(got.len(), 2);

        let got = run(
            "select * where k1 not in (1, 3)",
            vec![row(&[("k1", Value::Int(1))]), row(&[("k1", Value::Int(2))])],
        );
        assert_eq!(got, vec![row(&[("k1", Value::Int(2))])]);
    }

    #[test]
    fn test_between() {
        let got = run(
            "select * where k1 between 1 and 3",
            vec![
                row(&[("k1", Value::Int(0))]),
                row(&[("k1", Value::Int(2))]),
                row(&[("k1", Value::Int(3))]),
            ],
        );
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_like_and_regexp() {
        let input = vec![
            row(&[("k1", Value::String("main_test.go".into()))]),
            row(&[("k1", Value::String("main.go".into()))]),
        ];
        let got = run("select * where k1 like '%|_test.go'", input.clone());
        assert_eq!(got.len(), 1);

        let got = run("select * where k1 not like '%|_test.go'", input.clone());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].get("k1"), Some(&Value::String("main.go".into())));

        let got = run("select * where k1 regexp '_test\\.go$'", input);
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_is_null_and_is_truth() {
        let input = vec![
            row(&[("k1", Value::Null), ("k2", Value::Bool(true))]),
            row(&[("k1", Value::Int(1)), ("k2", Value::Bool(false))]),
        ];
        let got = run("select * where k1 is null", input.clone());
        assert_eq!(got.len(), 1);

        let got = run("select * where k1 is not null", input.clone());
        assert_eq!(got.len(), 1);

        let got = run("select * where k2 is true", input.clone());
        assert_eq!(got.len(), 1);

        let got = run("select * where k2 is not false", input);
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_unary_operators() {
        let got = run("select -k1 as n", vec![row(&[("k1", Value::Int(5))])]);
        assert_eq!(got, vec![row(&[("n", Value::Int(-5))])]);

        let got = run(
            "select * where not k1 > 0",
            vec![row(&[("k1", Value::Int(1))]), row(&[("k1", Value::Int(-1))])],
        );
        assert_eq!(got, vec![row(&[("k1", Value::Int(-1))])]);

        let got = run("select ~k1 as n", vec![row(&[("k1", Value::Int(0))])]);
        assert_eq!(got, vec![row(&[("n", Value::Int(-1))])]);
    }

    #[test]
    fn test_arithmetic_and_shift() {
        let got = run(
            "select k1 + 1 as a, k1 * 2 as b, k1 % 2 as c, k1 << 2 as d",
            vec![row(&[("k1", Value::Int(3))])],
        );
        assert_eq!(
            got,
            vec![row(&[
                ("a", Value::Int(4)),
                ("b", Value::Int(6)),
                ("c", Value::Int(1)),
                ("d", Value::Int(12)),
            ])]
        );
    }

    #[test]
    fn test_comparison_unknown_is_false() {
        // Int vs String is incomparable: both = and <> are false
        let input = vec![row(&[("k1", Value::String("x".into()))])];
        assert!(run("select * where k1 = 1", input.clone()).is_empty());
        assert!(run("select * where k1 <> 1", input).is_empty());
    }

    #[test]
    fn test_casts() {
        let got = run(
            "select to_int('12') as a, to_string(3) as b, to_duration('1h30m') as c",
            vec![row(&[("k1", Value::Int(0))])],
        );
        assert_eq!(
            got,
            vec![row(&[
                ("a", Value::Int(12)),
                ("b", Value::String("3".into())),
                ("c", Value::Duration(90 * 60 * 1_000_000_000)),
            ])]
        );
    }

    #[test]
    fn test_grep_generator_merges_rows() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        std::fs::write(&file, "a_key1=av1\na_key1=av2\n").unwrap();

        let got = run(
            "select grep('a_key1=(?P<a1>.+)', 'k1=$a1')",
            vec![row(&[("path", Value::String(file.display().to_string()))])],
        );
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].get("k1"), Some(&Value::String("av1".into())));
        assert_eq!(got[0].get("path"), Some(&Value::String(file.display().to_string())));
        assert_eq!(got[1].get("k1"), Some(&Value::String("av2".into())));
    }

    #[test]
    fn test_mixed_generator_and_scalar_fields_rejected() {
        let err = compile_one("select k1, grep('a', 'k=$0')").unwrap_err();
        assert!(matches!(err, Error::InvalidFunctionArity(_)));
    }

    #[test]
    fn test_arity_validated_at_compile_time() {
        assert!(matches!(
            compile_one("select substr(k1)").unwrap_err(),
            Error::InvalidFunctionArity(_)
        ));
        assert!(matches!(
            compile_one("select if(k1, 1)").unwrap_err(),
            Error::InvalidFunctionArity(_)
        ));
    }

    #[test]
    fn test_unknown_function_not_implemented() {
        assert!(matches!(
            compile_one("select nosuchfunc(k1)").unwrap_err(),
            Error::NotImplemented(_)
        ));
    }

    #[test]
    fn test_unknown_statement_not_implemented() {
        let statements = parser::parse("insert into t values (1)").unwrap();
        assert!(matches!(
            compile(&statements[0], &Cancellation::new()).unwrap_err(),
            Error::NotImplemented(_)
        ));
    }

    #[test]
    fn test_env_function() {
        std::env::set_var("NDQL_COMPILER_TEST", "ev");
        let got = run(
            "select env('NDQL_COMPILER_TEST') as a, envor('NDQL_COMPILER_MISSING', 'dflt') as b",
            vec![row(&[("k1", Value::Int(0))])],
        );
        assert_eq!(
            got,
            vec![row(&[
                ("a", Value::String("ev".into())),
                ("b", Value::String("dflt".into())),
            ])]
        );
    }

    #[test]
    fn test_negative_literal_in_list() {
        let got = run(
            "select * where k1 in (-1, -2)",
            vec![row(&[("k1", Value::Int(-1))]), row(&[("k1", Value::Int(1))])],
        );
        assert_eq!(got, vec![row(&[("k1", Value::Int(-1))])]);
    }
}
