//! Union-find clustering used to group overlapping cascade hits.

/// Find root of element `i` with path halving for amortized near-O(1).
pub fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
pub fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

/// Split `items` into equivalence classes under the transitive closure of
/// `same`.
///
/// Returns one label per item plus the number of classes. Labels are dense
/// (`0..n_classes`) and numbered in order of each class's first item.
pub fn partition<T>(items: &[T], same: impl Fn(&T, &T) -> bool) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..items.len()).collect();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if same(&items[i], &items[j]) {
                union(&mut parent, i, j);
            }
        }
    }

    let mut root_label = vec![usize::MAX; items.len()];
    let mut labels = Vec::with_capacity(items.len());
    let mut n_classes = 0;
    for i in 0..items.len() {
        let root = find(&mut parent, i);
        if root_label[root] == usize::MAX {
            root_label[root] = n_classes;
            n_classes += 1;
        }
        labels.push(root_label[root]);
    }
    (labels, n_classes)
}
