use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ndql_lib_core::{Error, Node, Result, StreamFunction};

/// Capacity of the feed and result channels of the concurrent driver.
const CHANNEL_CAPACITY: usize = 100;

/// A shared cancellation flag handed from the caller through the driver into
/// every template execution.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Worker count; values below 1 behave as 1 (sequential).
    pub concurrency: usize,
    pub cancel: Cancellation,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            cancel: Cancellation::new(),
        }
    }
}

/// Drive `input` through `function`, handing each produced row to `sink`.
///
/// Per-row failures drop the row: `Ignore` silently, anything else with a
/// debug log. Sequential mode preserves input order; concurrent mode does
/// not. Cancellation stops feeding; in-flight rows finish.
pub fn run(
    input: impl Iterator<Item = Node> + Send,
    function: &StreamFunction,
    options: &ExecOptions,
    sink: &mut dyn FnMut(Node),
) -> Result<()> {
    if options.concurrency <= 1 {
        run_sequential(input, function, &options.cancel, sink);
        return Ok(());
    }
    run_concurrent(input, function, options, sink)
}

fn run_sequential(
    input: impl Iterator<Item = Node>,
    function: &StreamFunction,
    cancel: &Cancellation,
    sink: &mut dyn FnMut(Node),
) {
    for row in input {
        if cancel.is_cancelled() {
            return;
        }
        match function.call_one(row) {
            Ok(rows) => rows.into_iter().for_each(&mut *sink),
            Err(Error::Ignore) => {}
            Err(err) => log::debug!("failed to yield node: {err}"),
        }
    }
}

fn run_concurrent(
    input: impl Iterator<Item = Node> + Send,
    function: &StreamFunction,
    options: &ExecOptions,
    sink: &mut dyn FnMut(Node),
) -> Result<()> {
    let workers = options.concurrency;
    let cancel = &options.cancel;
    let (feed_tx, feed_rx) = crossbeam_channel::bounded::<Node>(CHANNEL_CAPACITY);
    let (out_tx, out_rx) = crossbeam_channel::bounded::<Node>(CHANNEL_CAPACITY);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let feed_rx = feed_rx.clone();
            let out_tx = out_tx.clone();
            let cancel = cancel.clone();
            scope.spawn(move || {
                for row in feed_rx.iter() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    match function.call_one(row) {
                        Ok(rows) => {
                            for row in rows {
                                if out_tx.send(row).is_err() {
                                    return;
                                }
                            }
                        }
                        Err(Error::Ignore) => {}
                        Err(err) => log::debug!("failed to yield node: {err}"),
                    }
                }
            });
        }
        drop(feed_rx);
        drop(out_tx);

        let producer_cancel = cancel.clone();
        scope.spawn(move || {
            for row in input {
                if producer_cancel.is_cancelled() {
                    break;
                }
                if feed_tx.send(row).is_err() {
                    break;
                }
            }
            // dropping the sender closes the channel and drains the workers
        });

        for row in out_rx.iter() {
            sink(row);
        }
    });

    Ok(())
}

/// A shared, pull-on-demand view over one underlying row source.
///
/// Clones read the arena by index and pull from the source only past its
/// tail; the arena lives until the last clone is dropped.
pub struct CloneableIter {
    arena: Arc<Mutex<CloneArena>>,
    index: usize,
}

struct CloneArena {
    source: Box<dyn Iterator<Item = Node> + Send>,
    pulled: Vec<Node>,
    exhausted: bool,
}

impl CloneableIter {
    pub fn new(source: impl Iterator<Item = Node> + Send + 'static) -> Self {
        Self {
            arena: Arc::new(Mutex::new(CloneArena {
                source: Box::new(source),
                pulled: Vec::new(),
                exhausted: false,
            })),
            index: 0,
        }
    }

    /// A new view starting from the beginning of the source.
    pub fn clone_view(&self) -> Self {
        Self {
            arena: Arc::clone(&self.arena),
            index: 0,
        }
    }
}

impl Iterator for CloneableIter {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let mut arena = self.arena.lock().unwrap();
        while self.index >= arena.pulled.len() {
            if arena.exhausted {
                return None;
            }
            match arena.source.next() {
                Some(row) => arena.pulled.push(row),
                None => {
                    arena.exhausted = true;
                    return None;
                }
            }
        }
        let row = arena.pulled[self.index].clone();
        self.index += 1;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use ndql_lib_core::Value;

    use super::*;

    fn row(v: i64) -> Node {
        let mut n = Node::new();
        n.set("k", Value::Int(v));
        n
    }

    fn values(rows: &[Node]) -> Vec<i64> {
        rows.iter().map(|n| n.get("k").and_then(Value::int).unwrap()).collect()
    }

    fn collect(
        input: Vec<Node>,
        function: &StreamFunction,
        options: &ExecOptions,
    ) -> Vec<Node> {
        let mut out = Vec::new();
        run(input.into_iter(), function, options, &mut |n| out.push(n)).unwrap();
        out
    }

    #[test]
    fn test_sequential_preserves_order() {
        let f = StreamFunction::map(|mut n: Node| {
            let v = n.get("k").and_then(Value::int).unwrap();
            n.set("k", Value::Int(v * 10));
            Ok(n)
        });
        let got = collect((0..5).map(row).collect(), &f, &ExecOptions::default());
        assert_eq!(values(&got), vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_sequential_drops_failing_rows() {
        let f = StreamFunction::map(|n: Node| {
            match n.get("k").and_then(Value::int) {
                Some(v) if v % 2 == 0 => Ok(n),
                Some(1) => Err(Error::Ignore),
                _ => Err(Error::InvalidValue("odd".into())),
            }
        });
        let got = collect((0..6).map(row).collect(), &f, &ExecOptions::default());
        assert_eq!(values(&got), vec![0, 2, 4]);
    }

    #[test]
    fn test_concurrent_yields_all_rows() {
        let f = StreamFunction::fanout(|n: Node| Ok(vec![n.clone(), n]));
        let options = ExecOptions {
            concurrency: 4,
            ..Default::default()
        };
        let got = collect((0..50).map(row).collect(), &f, &options);
        assert_eq!(got.len(), 100);
        let unique: BTreeSet<i64> = values(&got).into_iter().collect();
        assert_eq!(unique.len(), 50);
    }

    #[test]
    fn test_concurrent_drops_failing_rows() {
        let f = StreamFunction::map(|n: Node| {
            match n.get("k").and_then(Value::int) {
                Some(v) if v % 2 == 0 => Ok(n),
                _ => Err(Error::Ignore),
            }
        });
        let options = ExecOptions {
            concurrency: 3,
            ..Default::default()
        };
        let got = collect((0..20).map(row).collect(), &f, &options);
        assert_eq!(got.len(), 10);
    }

    #[test]
    fn test_cancelled_before_start_yields_nothing() {
        let options = ExecOptions::default();
        options.cancel.cancel();
        let mut out = Vec::new();
        run(
            (0..5).map(row),
            &StreamFunction::identity(),
            &options,
            &mut |n| out.push(n),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_cloneable_iter_independent_views() {
        let it = CloneableIter::new((0..3).map(row));
        let other = it.clone_view();
        assert_eq!(values(&it.collect::<Vec<_>>()), vec![0, 1, 2]);
        assert_eq!(values(&other.collect::<Vec<_>>()), vec![0, 1, 2]);
    }

    #[test]
    fn test_cloneable_iter_interleaved() {
        let mut a = CloneableIter::new((0..4).map(row));
        let mut b = a.clone_view();
        assert_eq!(a.next(), Some(row(0)));
        assert_eq!(b.next(), Some(row(0)));
        assert_eq!(b.next(), Some(row(1)));
        assert_eq!(a.next(), Some(row(1)));
        // dropping one view does not stop the other
        drop(a);
        assert_eq!(b.next(), Some(row(2)));
        assert_eq!(b.next(), Some(row(3)));
        assert_eq!(b.next(), None);
    }

    #[test]
    fn test_cloneable_iter_source_pulled_once() {
        let counter = Arc::new(AtomicBool::new(false));
        let seen = counter.clone();
        let source = (0..1).map(move |v| {
            assert!(!seen.swap(true, Ordering::SeqCst), "source pulled twice");
            row(v)
        });
        let it = CloneableIter::new(source);
        let other = it.clone_view();
        assert_eq!(it.count(), 1);
        assert_eq!(other.count(), 1);
    }
}
