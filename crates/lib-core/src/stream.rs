use crate::errors::{Error, Result};
use crate::row::Node;

/// Input/output arity of a stream function side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Variadic,
}

type MapFn = Box<dyn Fn(Node) -> Result<Node> + Send + Sync>;
type ReduceFn = Box<dyn Fn(Vec<Node>) -> Result<Node> + Send + Sync>;
type FanoutFn = Box<dyn Fn(Node) -> Result<Vec<Node>> + Send + Sync>;
type MultiMapFn = Box<dyn Fn(Vec<Node>) -> Result<Vec<Node>> + Send + Sync>;

/// A typed row transformer: one concrete shape per (input, output) arity.
///
/// Composition is total; the composed shape follows the table in the module
/// tests, bridging arity with the lifting conversions where needed. Errors
/// abort only the flow of the element being processed.
pub enum StreamFunction {
    Map(MapFn),
    Reduce(ReduceFn),
    Fanout(FanoutFn),
    MultiMap(MultiMapFn),
}

impl std::fmt::Debug for StreamFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.shape())
    }
}

impl StreamFunction {
    pub fn map(f: impl Fn(Node) -> Result<Node> + Send + Sync + 'static) -> Self {
        StreamFunction::Map(Box::new(f))
    }

    pub fn reduce(f: impl Fn(Vec<Node>) -> Result<Node> + Send + Sync + 'static) -> Self {
        StreamFunction::Reduce(Box::new(f))
    }

    pub fn fanout(f: impl Fn(Node) -> Result<Vec<Node>> + Send + Sync + 'static) -> Self {
        StreamFunction::Fanout(Box::new(f))
    }

    pub fn multi_map(f: impl Fn(Vec<Node>) -> Result<Vec<Node>> + Send + Sync + 'static) -> Self {
        StreamFunction::MultiMap(Box::new(f))
    }

    pub fn identity() -> Self {
        Self::map(Ok)
    }

    pub fn shape(&self) -> &'static str {
        match self {
            StreamFunction::Map(_) => "map",
            StreamFunction::Reduce(_) => "reduce",
            StreamFunction::Fanout(_) => "fanout",
            StreamFunction::MultiMap(_) => "multimap",
        }
    }

    pub fn arg_arity(&self) -> Arity {
        match self {
            StreamFunction::Map(_) | StreamFunction::Fanout(_) => Arity::Unary,
            StreamFunction::Reduce(_) | StreamFunction::MultiMap(_) => Arity::Variadic,
        }
    }

    pub fn ret_arity(&self) -> Arity {
        match self {
            StreamFunction::Map(_) | StreamFunction::Reduce(_) => Arity::Unary,
            StreamFunction::Fanout(_) | StreamFunction::MultiMap(_) => Arity::Variadic,
        }
    }

    /// Apply to an argument list regardless of shape; unary shapes require
    /// exactly one element.
    pub fn call_any(&self, rows: Vec<Node>) -> Result<Vec<Node>> {
        match self {
            StreamFunction::Map(f) => {
                let [row] = try_single(rows, "map")?;
                Ok(vec![f(row)?])
            }
            StreamFunction::Reduce(f) => Ok(vec![f(rows)?]),
            StreamFunction::Fanout(f) => {
                let [row] = try_single(rows, "fanout")?;
                f(row)
            }
            StreamFunction::MultiMap(f) => f(rows),
        }
    }

    /// Apply to a single row.
    pub fn call_one(&self, row: Node) -> Result<Vec<Node>> {
        match self {
            StreamFunction::Map(f) => Ok(vec![f(row)?]),
            StreamFunction::Reduce(f) => Ok(vec![f(vec![row])?]),
            StreamFunction::Fanout(f) => f(row),
            StreamFunction::MultiMap(f) => f(vec![row]),
        }
    }

    /// Lift to the variadic-in, variadic-out shape.
    fn into_multi_map_fn(self) -> MultiMapFn {
        match self {
            StreamFunction::Map(f) => Box::new(move |rows| rows.into_iter().map(&f).collect()),
            StreamFunction::Reduce(f) => Box::new(move |rows| Ok(vec![f(rows)?])),
            StreamFunction::Fanout(f) => Box::new(move |rows| {
                let mut out = Vec::new();
                for row in rows {
                    out.extend(f(row)?);
                }
                Ok(out)
            }),
            StreamFunction::MultiMap(f) => f,
        }
    }

    /// Pipe: `(f.then(g))(x) = g(f(x))`, with the shape of the result
    /// dictated by the pair of input shapes. Every pair composes.
    pub fn then(self, g: StreamFunction) -> StreamFunction {
        use StreamFunction::*;
        match (self, g) {
            (Map(f), Map(g)) => Self::map(move |x| g(f(x)?)),
            (Map(f), Reduce(g)) => Self::map(move |x| g(vec![f(x)?])),
            (Map(f), Fanout(g)) => Self::fanout(move |x| g(f(x)?)),
            (Map(f), g @ MultiMap(_)) => {
                let g = g.into_multi_map_fn();
                Self::fanout(move |x| g(vec![f(x)?]))
            }
            (Reduce(f), Map(g)) => Self::reduce(move |xs| g(f(xs)?)),
            (Reduce(f), Reduce(g)) => Self::reduce(move |xs| g(vec![f(xs)?])),
            (Reduce(f), Fanout(g)) => Self::multi_map(move |xs| g(f(xs)?)),
            (Reduce(f), g @ MultiMap(_)) => {
                let g = g.into_multi_map_fn();
                Self::multi_map(move |xs| g(vec![f(xs)?]))
            }
            (Fanout(f), g @ Map(_)) => {
                let g = g.into_multi_map_fn();
                Self::fanout(move |x| g(f(x)?))
            }
            (Fanout(f), Reduce(g)) => Self::map(move |x| g(f(x)?)),
            (Fanout(f), g @ Fanout(_)) => {
                let g = g.into_multi_map_fn();
                Self::fanout(move |x| g(f(x)?))
            }
            (Fanout(f), MultiMap(g)) => Self::fanout(move |x| g(f(x)?)),
            (MultiMap(f), g @ Map(_)) => {
                let g = g.into_multi_map_fn();
                Self::multi_map(move |xs| g(f(xs)?))
            }
            (MultiMap(f), Reduce(g)) => Self::reduce(move |xs| g(f(xs)?)),
            (MultiMap(f), g @ Fanout(_)) => {
                let g = g.into_multi_map_fn();
                Self::multi_map(move |xs| g(f(xs)?))
            }
            (MultiMap(f), MultiMap(g)) => Self::multi_map(move |xs| g(f(xs)?)),
        }
    }
}

fn try_single(rows: Vec<Node>, shape: &str) -> Result<[Node; 1]> {
    let n = rows.len();
    <[Node; 1]>::try_from(rows).map_err(|_| {
        Error::InvalidFunctionArity(format!("failed to call {shape} function with {n} arguments"))
    })
}
