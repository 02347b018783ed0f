use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// DepGraph is the view execution has on a log of instances.
pub trait DepGraph {
    type Key: Copy + Eq + Hash + Debug;
    type Order: Ord;

    /// predecessors returns the committed, not yet executed instances `key` has to execute
    /// after. Executed instances and those that can not interfere are left out.
    ///
    /// It returns `Err(blocker)` if some dependency is not committed yet, or is not even known.
    fn predecessors(&self, key: Self::Key) -> Result<Vec<Self::Key>, Self::Key>;

    /// order is the order of instances inside one strongly connected component.
    fn order(&self, key: Self::Key) -> Self::Order;
}

struct Frame<K> {
    key: K,
    preds: Vec<K>,
    next: usize,
}

/// find_sccs runs Tarjan's algorithm backward from `root` and returns the strongly connected
/// components in the order they must be executed, i.e. every component comes after all of the
/// components it depends on. Every component is sorted by `DepGraph::order`.
///
/// The traversal is iterative. Nothing is modified: on reaching an uncommitted dependency it
/// returns `Err(blocker)` and the caller may retry later.
pub fn find_sccs<G: DepGraph>(g: &G, root: G::Key) -> Result<Vec<Vec<G::Key>>, G::Key> {
    // key -> (dfn, low)
    let mut marks: HashMap<G::Key, (usize, usize)> = HashMap::new();
    let mut on_stack: HashSet<G::Key> = HashSet::new();
    let mut stack: Vec<G::Key> = Vec::new();
    let mut calls: Vec<Frame<G::Key>> = Vec::new();
    let mut sccs = Vec::new();
    let mut index = 0;

    let preds = g.predecessors(root)?;
    marks.insert(root, (index, index));
    index += 1;
    stack.push(root);
    on_stack.insert(root);
    calls.push(Frame {
        key: root,
        preds,
        next: 0,
    });

    while let Some(top) = calls.len().checked_sub(1) {
        let frame = &mut calls[top];

        if frame.next < frame.preds.len() {
            let w = frame.preds[frame.next];
            frame.next += 1;
            let v = frame.key;

            match marks.get(&w).copied() {
                None => {
                    let preds = g.predecessors(w)?;
                    marks.insert(w, (index, index));
                    index += 1;
                    stack.push(w);
                    on_stack.insert(w);
                    calls.push(Frame {
                        key: w,
                        preds,
                        next: 0,
                    });
                }
                Some((w_dfn, _)) => {
                    if on_stack.contains(&w) {
                        lower(&mut marks, v, w_dfn);
                    }
                }
            }
            continue;
        }

        let v = frame.key;
        calls.pop();

        let (v_dfn, v_low) = marks[&v];
        if let Some(parent) = calls.last() {
            lower(&mut marks, parent.key, v_low);
        }

        if v_low == v_dfn {
            let mut comp = Vec::new();
            while let Some(w) = stack.pop() {
                on_stack.remove(&w);
                comp.push(w);
                if w == v {
                    break;
                }
            }
            comp.sort_by_key(|k| g.order(*k));
            sccs.push(comp);
        }
    }

    Ok(sccs)
}

fn lower<K: Eq + Hash>(marks: &mut HashMap<K, (usize, usize)>, key: K, low: usize) {
    if let Some(m) = marks.get_mut(&key) {
        if low < m.1 {
            m.1 = low;
        }
    }
}
