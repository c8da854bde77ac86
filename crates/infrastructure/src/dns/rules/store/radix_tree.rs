use compact_str::CompactString;

/// A node of the compressed radix tree. Children never share a first
/// character, so at most one child can continue any key.
#[derive(Default)]
struct RadixNode {
    label: CompactString,
    children: Vec<RadixNode>,
    /// Bitmap of list ordinals holding the key that ends here.
    mask: u64,
}

impl RadixNode {
    fn leaf(label: &str, mask: u64) -> Self {
        Self {
            label: CompactString::new(label),
            children: Vec::new(),
            mask,
        }
    }

    fn clear_bits(&mut self, bits: u64) -> usize {
        let mut emptied = 0;
        if self.mask != 0 {
            self.mask &= !bits;
            if self.mask == 0 {
                emptied += 1;
            }
        }
        for child in &mut self.children {
            emptied += child.clear_bits(bits);
        }
        emptied
    }
}

/// Length of the longest common prefix, on a character boundary.
fn common_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Exact-match radix tree from rule text to a `u64` list bitmap.
///
/// Shared prefixes are stored once; inserting a key that ends inside an
/// edge splits that edge.
#[derive(Default)]
pub(crate) struct RadixTree {
    root: RadixNode,
    keys: usize,
}

impl RadixTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys with a non-empty bitmap.
    pub fn len(&self) -> usize {
        self.keys
    }

    /// OR `mask` into the bitmap stored under `key`.
    pub fn insert(&mut self, key: &str, mask: u64) {
        if mask == 0 {
            return;
        }

        let mut node = &mut self.root;
        let mut rest = key;

        loop {
            if rest.is_empty() {
                if node.mask == 0 {
                    self.keys += 1;
                }
                node.mask |= mask;
                return;
            }

            let first = rest.chars().next();
            let Some(idx) = node
                .children
                .iter()
                .position(|child| child.label.chars().next() == first)
            else {
                node.children.push(RadixNode::leaf(rest, mask));
                self.keys += 1;
                return;
            };

            let child = &mut node.children[idx];
            let common = common_prefix(&child.label, rest);
            if common < child.label.len() {
                // split the edge at the divergence point
                let tail = RadixNode {
                    label: CompactString::new(&child.label[common..]),
                    children: std::mem::take(&mut child.children),
                    mask: std::mem::take(&mut child.mask),
                };
                child.label.truncate(common);
                child.children.push(tail);
            }

            rest = &rest[common..];
            node = child;
        }
    }

    /// Bitmap stored under exactly `key`, 0 when absent.
    pub fn get(&self, key: &str) -> u64 {
        let mut node = &self.root;
        let mut rest = key;

        loop {
            if rest.is_empty() {
                return node.mask;
            }
            let Some(child) = node
                .children
                .iter()
                .find(|child| rest.starts_with(child.label.as_str()))
            else {
                return 0;
            };
            rest = &rest[child.label.len()..];
            node = child;
        }
    }

    /// Remove `bits` from every bitmap.
    pub fn clear_bits(&mut self, bits: u64) {
        let emptied = self.root.clear_bits(bits);
        self.keys = self.keys.saturating_sub(emptied);
    }
}
