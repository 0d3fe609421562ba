use sqlparser::ast::{Expr, Function, FunctionArg, FunctionArgExpr};

use ndql_lib_core::stream::Arity;
use ndql_lib_core::{Error, Node, Result, StreamFunction, Value};

use crate::compiler::{container_fn, not_implemented, validate_single_variadic, value_container, Compiler};
use crate::executor::Cancellation;
use crate::templates::{
    generate_rows, load_body, GenTemplate, GrepTemplate, LuaTemplate, ScriptTemplate,
    ShellTemplate, TextTemplate,
};

const FUNC_ARG_MAX: usize = 100;

impl Compiler {
    /// Function calls dispatch by lowercase name; arity windows are checked
    /// at compile time.
    pub(super) fn function_call(&self, function: &Function) -> Result<StreamFunction> {
        let name = function
            .name
            .0
            .last()
            .map(|ident| ident.value.to_lowercase())
            .unwrap_or_default();
        let args = unwrap_args(&function.args)?;
        self.dispatch(&name, &args)
            .map_err(|err| err.context(format!("function {name}")))
    }

    fn dispatch(&self, name: &str, args: &[&Expr]) -> Result<StreamFunction> {
        match name {
            // generators
            "expr" => self.generator(args, name, 1, 1, |v| {
                Ok(Box::new(ScriptTemplate::new(load_body(string_arg(v, 0)?)?)))
            }),
            "lua" => self.generator(args, name, 2, 2, |v| {
                Ok(Box::new(LuaTemplate::new(
                    load_body(string_arg(v, 0)?)?,
                    string_arg(v, 1)?,
                )))
            }),
            "grep" => self.generator(args, name, 2, 2, |v| {
                Ok(Box::new(GrepTemplate::new(
                    string_arg(v, 0)?,
                    string_arg(v, 1)?,
                )))
            }),
            "sh" => self.generator(args, name, 1, 1, |v| {
                Ok(Box::new(ShellTemplate::new(load_body(string_arg(v, 0)?)?)))
            }),
            "tmpl" => self.generator(args, name, 1, 1, |v| {
                Ok(Box::new(TextTemplate::new(load_body(string_arg(v, 0)?)?)))
            }),

            // casts
            "to_int" => self.unary(args, name, |v| v.as_int()),
            "to_float" => self.unary(args, name, |v| v.as_float()),
            "to_bool" => self.unary(args, name, |v| v.as_bool()),
            "to_string" => self.unary(args, name, |v| v.as_string()),
            "to_time" => self.unary(args, name, |v| v.as_time()),
            "to_duration" => self.unary(args, name, |v| v.as_duration()),

            // selection
            "least" => self.variadic(args, name, 1, FUNC_ARG_MAX, |v| Ok(v[0].least(&v[1..]))),
            "greatest" => self.variadic(args, name, 1, FUNC_ARG_MAX, |v| Ok(v[0].greatest(&v[1..]))),
            "coalesce" => self.variadic(args, name, 1, FUNC_ARG_MAX, |v| Ok(v[0].coalesce(&v[1..]))),

            // control
            "if" => self.variadic(args, name, 3, 3, |v| Ok(v[0].if_then(&v[1], &v[2]))),
            "ifnull" => self.variadic(args, name, 2, 2, |v| Ok(v[0].if_null(&v[1]))),
            "nullif" => self.variadic(args, name, 2, 2, |v| Ok(v[0].null_if(&v[1]))),

            // math
            "abs" => self.unary(args, name, |v| v.abs()),
            "sqrt" => self.unary(args, name, |v| v.sqrt()),
            "degrees" => self.unary(args, name, |v| v.degrees()),
            "radians" => self.unary(args, name, |v| v.radians()),
            "acos" => self.unary(args, name, |v| v.acos()),
            "asin" => self.unary(args, name, |v| v.asin()),
            "atan" => self.unary(args, name, |v| v.atan()),
            "cos" => self.unary(args, name, |v| v.cos()),
            "sin" => self.unary(args, name, |v| v.sin()),
            "tan" => self.unary(args, name, |v| v.tan()),
            "cot" => self.unary(args, name, |v| v.cot()),
            "ln" => self.unary(args, name, |v| v.ln()),
            "log2" => self.unary(args, name, |v| v.log2()),
            "log10" => self.unary(args, name, |v| v.log10()),
            "exp" => self.unary(args, name, |v| v.exp()),
            "ceil" => self.unary(args, name, |v| v.ceil()),
            "floor" => self.unary(args, name, |v| v.floor()),
            "round" => self.unary(args, name, |v| v.round()),
            "inverse" => self.unary(args, name, |v| v.inverse()),
            "atan2" => self.variadic(args, name, 2, 2, |v| v[0].atan2(&v[1])),
            "pow" => self.variadic(args, name, 2, 2, |v| v[0].pow(&v[1])),
            "e" => self.nullary(args, name, ndql_lib_core::value::e),
            "pi" => self.nullary(args, name, ndql_lib_core::value::pi),
            "rand" => self.nullary(args, name, ndql_lib_core::value::random),

            // string
            "len" => self.unary(args, name, |v| v.len()),
            "size" => self.unary(args, name, |v| v.size()),
            "format" => self.variadic(args, name, 1, FUNC_ARG_MAX, |v| v[0].format(&v[1..])),
            "lower" => self.unary(args, name, |v| v.lower()),
            "upper" => self.unary(args, name, |v| v.upper()),
            "sha2" => self.unary(args, name, |v| v.sha2()),
            "concat_ws" => self.variadic(args, name, 1, FUNC_ARG_MAX, |v| v[0].concat_ws(&v[1..])),
            "instr" => self.variadic(args, name, 2, 2, |v| v[0].instr(&v[1])),
            "instr_count" => self.variadic(args, name, 2, 2, |v| v[0].instr_count(&v[1])),
            "substr" => self.variadic(args, name, 2, 3, |v| v[0].substr(&v[1..])),
            "substr_index" => self.variadic(args, name, 3, 3, |v| v[0].substr_index(&v[1], &v[2])),
            "replace" => self.variadic(args, name, 3, 3, |v| v[0].replace(&v[1], &v[2])),
            "trim" => self.variadic(args, name, 1, 2, |v| v[0].trim(&v[1..])),
            "regexp_count" => self.variadic(args, name, 2, 2, |v| v[0].regexp_count(&v[1])),
            "regexp_instr" => self.variadic(args, name, 2, 2, |v| v[0].regexp_instr(&v[1])),
            "regexp_substr" => self.variadic(args, name, 2, 2, |v| v[0].regexp_substr(&v[1])),
            "regexp_replace" => {
                self.variadic(args, name, 3, 3, |v| v[0].regexp_replace(&v[1], &v[2]))
            }
            "regexp_like" => self.variadic(args, name, 2, 2, |v| v[0].regexp(&v[1])),

            // time
            "strtotime" => self.variadic(args, name, 2, 2, |v| v[0].str_to_time(&v[1])),
            "timeformat" => self.variadic(args, name, 2, 2, |v| v[0].time_format(&v[1])),
            "year" => self.unary(args, name, |v| v.year()),
            "month" => self.unary(args, name, |v| v.month()),
            "day" => self.unary(args, name, |v| v.day()),
            "hour" => self.unary(args, name, |v| v.hour()),
            "minute" => self.unary(args, name, |v| v.minute()),
            "second" => self.unary(args, name, |v| v.second()),
            "dayofweek" => self.unary(args, name, |v| v.day_of_week()),
            "dayofyear" => self.unary(args, name, |v| v.day_of_year()),
            "newtime" => self.variadic(args, name, 1, 6, |v| v[0].new_time(&v[1..])),
            "sleep" => self.unary(args, name, |v| v.sleep()),
            "now" => self.nullary(args, name, ndql_lib_core::value::now),

            // path
            "dir" => self.unary(args, name, |v| v.dir()),
            "basename" => self.unary(args, name, |v| v.basename()),
            "extension" => self.unary(args, name, |v| v.extension()),
            "abspath" => self.unary(args, name, |v| v.abs_path()),
            "relpath" => self.variadic(args, name, 2, 2, |v| v[0].rel_path(&v[1])),

            // env
            "env" => self.unary(args, name, |v| v.env()),
            "envor" => self.variadic(args, name, 2, 2, |v| v[0].env_or(&v[1])),

            other => Err(not_implemented(format!("function {other}"))),
        }
    }

    fn check_arity(&self, args: &[&Expr], min: usize, max: usize) -> Result<()> {
        if args.len() >= min && args.len() <= max {
            return Ok(());
        }
        Err(Error::InvalidFunctionArity(format!(
            "arg len should be in [{min}, {max}] but got {}",
            args.len()
        )))
    }

    fn compile_args(&self, args: &[&Expr]) -> Result<Vec<StreamFunction>> {
        args.iter()
            .enumerate()
            .map(|(i, e)| self.expr(e).map_err(|err| err.context(format!("arg[{i}]"))))
            .collect()
    }

    fn nullary(&self, args: &[&Expr], name: &str, f: fn() -> Value) -> Result<StreamFunction> {
        self.check_arity(args, 0, 0)?;
        Ok(container_fn(name, move |_| Ok(f())))
    }

    fn unary(
        &self,
        args: &[&Expr],
        name: &str,
        f: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<StreamFunction> {
        self.check_arity(args, 1, 1)?;
        let arg = self.compile_args(args)?.remove(0);
        Ok(arg.then(container_fn(name, move |v| f(&v))))
    }

    fn variadic(
        &self,
        args: &[&Expr],
        name: &str,
        min: usize,
        max: usize,
        f: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<StreamFunction> {
        self.check_arity(args, min, max)?;
        let compiled = self.compile_args(args)?;
        validate_single_variadic(&compiled)?;

        if compiled[0].ret_arity() == Arity::Variadic {
            if min > 1 {
                return Err(Error::InvalidArgument(format!(
                    "variadic argument mismatched with [{min}, {max}]"
                )));
            }
            let mut compiled = compiled;
            let head = compiled.remove(0);
            return Ok(head.then(container_fn(name, move |v| f(&[v]))));
        }

        Ok(StreamFunction::map(move |n: Node| {
            let values = eval_arg_values(&compiled, &n)?;
            Ok(value_container(f(&values)?))
        }))
    }

    /// Generator calls become Fanout functions: per input row, build the
    /// template from the argument values, run it, and merge the generated
    /// rows into clones of the input.
    fn generator(
        &self,
        args: &[&Expr],
        name: &str,
        min: usize,
        max: usize,
        make: impl Fn(&[Value]) -> Result<Box<dyn GenTemplate>> + Send + Sync + 'static,
    ) -> Result<StreamFunction> {
        self.check_arity(args, min, max)?;
        let compiled = self.compile_args(args)?;
        validate_single_variadic(&compiled)?;
        let cancel = self.cancel.clone();
        let name = name.to_string();

        if compiled[0].ret_arity() == Arity::Variadic {
            if min > 1 {
                return Err(Error::InvalidArgument(format!(
                    "generator variadic argument mismatched with [{min}, {max}]"
                )));
            }
            let mut compiled = compiled;
            let head = compiled.remove(0);
            return Ok(head.then(generator_over_produced(name, make, cancel)));
        }

        Ok(StreamFunction::fanout(move |n: Node| {
            let values = eval_arg_values(&compiled, &n)?;
            let template = make(&values).map_err(|err| err.context(name.as_str()))?;
            generate_rows(template.as_ref(), &cancel, &n)
        }))
    }
}

/// The upstream argument already fans out: build one template per produced
/// value, skipping (with a warning) values that fail.
fn generator_over_produced(
    name: String,
    make: impl Fn(&[Value]) -> Result<Box<dyn GenTemplate>> + Send + Sync + 'static,
    cancel: Cancellation,
) -> StreamFunction {
    StreamFunction::multi_map(move |produced: Vec<Node>| {
        let mut out = Vec::new();
        for row in &produced {
            let Some((_, value)) = row.first() else {
                log::warn!("{name}: generator argument produced no value");
                continue;
            };
            let template = match make(&[value.clone()]) {
                Ok(t) => t,
                Err(err) => {
                    log::warn!("{name}: failed to create template: {err}");
                    continue;
                }
            };
            match generate_rows(template.as_ref(), &cancel, row) {
                Ok(rows) => out.extend(rows),
                Err(err) => log::warn!("{name}: failed to generate: {err}"),
            }
        }
        Ok(out)
    })
}

fn eval_arg_values(compiled: &[StreamFunction], input: &Node) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(compiled.len());
    for (i, f) in compiled.iter().enumerate() {
        let produced = f
            .call_one(input.clone())
            .map_err(|err| err.context(format!("arg[{i}]")))?;
        let Some((_, value)) = produced.first().and_then(Node::first) else {
            return Err(Error::InvalidValue(format!("arg[{i}] contains no value")));
        };
        values.push(value.clone());
    }
    Ok(values)
}

fn string_arg(values: &[Value], index: usize) -> Result<&str> {
    values
        .get(index)
        .and_then(Value::string)
        .ok_or_else(|| Error::InvalidArgument(format!("arg[{index}] should be String")))
}

fn unwrap_args(args: &[FunctionArg]) -> Result<Vec<&Expr>> {
    args.iter()
        .map(|arg| match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Ok(e),
            other => Err(not_implemented(format!("function argument {other}"))),
        })
        .collect()
}
