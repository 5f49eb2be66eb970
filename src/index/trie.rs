//! In-memory batch trie.
//!
//! One [`BatchTrie`] accumulates every substring of every token seen in the
//! current batch of input lines. Nodes live in an arena indexed by [`NodeId`]
//! rather than behind owned pointers, which keeps the flush serialization a
//! straightforward walk. The builder is drained and reused between batches.

use crate::index::types::LineId;
use rustc_hash::FxHashMap;

/// Index of a node within the arena
pub type NodeId = u32;

/// Root node of every trie, present from construction
pub const ROOT: NodeId = 0;

struct TrieNode {
    children: FxHashMap<char, NodeId>,
    /// Terminal payload: ids of lines whose tokens produced a substring
    /// ending at this node. Kept sorted and deduplicated on insert, so a
    /// flush can delta-encode it directly. Interning alone does not give
    /// this ordering: a line text repeated later in the batch reuses its
    /// earlier id.
    lines: Vec<LineId>,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            children: FxHashMap::default(),
            lines: Vec::new(),
        }
    }
}

/// Trie over the substrings of one batch of input lines
pub struct BatchTrie {
    nodes: Vec<TrieNode>,
    lines: Vec<String>,
    line_ids: FxHashMap<String, LineId>,
}

impl BatchTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new()],
            lines: Vec::new(),
            line_ids: FxHashMap::default(),
        }
    }

    /// Intern an originating line, returning its id within this batch.
    /// Identical line text interns to the same id, so terminal payloads
    /// stay true sets of lines.
    pub fn intern_line(&mut self, line: &str) -> LineId {
        if let Some(&id) = self.line_ids.get(line) {
            return id;
        }
        let id = self.lines.len() as LineId;
        self.lines.push(line.to_string());
        self.line_ids.insert(line.to_string(), id);
        id
    }

    /// Insert one substring, tagging its terminal node with `line`
    pub fn insert(&mut self, substring: &str, line: LineId) {
        let mut current = ROOT;
        for ch in substring.chars() {
            current = match self.nodes[current as usize].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len() as NodeId;
                    self.nodes.push(TrieNode::new());
                    self.nodes[current as usize].children.insert(ch, child);
                    child
                }
            };
        }
        if current == ROOT {
            // Empty substring: never stored, the shortest entry is one char
            return;
        }
        let lines = &mut self.nodes[current as usize].lines;
        if let Err(pos) = lines.binary_search(&line) {
            lines.insert(pos, line);
        }
    }

    /// Children of a node, sorted by character for deterministic layout
    pub fn children_sorted(&self, node: NodeId) -> Vec<(char, NodeId)> {
        let mut children: Vec<_> = self.nodes[node as usize]
            .children
            .iter()
            .map(|(&ch, &id)| (ch, id))
            .collect();
        children.sort_unstable_by_key(|&(ch, _)| ch);
        children
    }

    /// Terminal payload of a node (empty when the node is not terminal)
    pub fn terminal(&self, node: NodeId) -> &[LineId] {
        &self.nodes[node as usize].lines
    }

    /// Interned line table for this batch
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True when no line has been interned into this batch
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Reset to a fresh single-root trie after a flush
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(TrieNode::new());
        self.lines.clear();
        self.line_ids.clear();
    }
}

impl Default for BatchTrie {
    fn default() -> Self {
        Self::new()
    }
}

/// All contiguous substrings of a token, in (start, end) order.
///
/// A token of n characters yields n*(n+1)/2 substrings; the empty token
/// yields none. Substrings are character-exact, no normalization.
pub fn substrings(token: &str) -> Vec<&str> {
    let boundaries: Vec<usize> = token
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(token.len()))
        .collect();
    let n = boundaries.len() - 1;

    let mut result = Vec::with_capacity(n * (n + 1) / 2);
    for start in 0..n {
        for end in start..n {
            result.push(&token[boundaries[start]..boundaries[end + 1]]);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substrings_all_ranges() {
        let subs = substrings("cat");
        assert_eq!(subs, vec!["c", "ca", "cat", "a", "at", "t"]);
    }

    #[test]
    fn test_substrings_count() {
        for token in ["x", "ab", "hello", "abcdefgh"] {
            let n = token.chars().count();
            assert_eq!(substrings(token).len(), n * (n + 1) / 2);
        }
    }

    #[test]
    fn test_substrings_empty_token() {
        assert!(substrings("").is_empty());
    }

    #[test]
    fn test_substrings_multibyte() {
        let subs = substrings("héllo");
        assert_eq!(subs.len(), 15);
        assert!(subs.contains(&"hé"));
        assert!(subs.contains(&"éllo"));
    }

    #[test]
    fn test_insert_and_descend() {
        let mut trie = BatchTrie::new();
        let line = trie.intern_line("cat dog");
        for sub in substrings("cat") {
            trie.insert(sub, line);
        }

        // "ca" is reachable and terminal
        let mut node = ROOT;
        for ch in "ca".chars() {
            let children = trie.children_sorted(node);
            node = children.iter().find(|(c, _)| *c == ch).unwrap().1;
        }
        assert_eq!(trie.terminal(node), &[line]);
    }

    #[test]
    fn test_insert_deduplicates_line() {
        let mut trie = BatchTrie::new();
        let line = trie.intern_line("aa bb");
        // "a" is produced twice by the token "aa"
        for sub in substrings("aa") {
            trie.insert(sub, line);
        }
        let children = trie.children_sorted(ROOT);
        let (_, a_node) = children[0];
        assert_eq!(trie.terminal(a_node), &[line]);
    }

    #[test]
    fn test_insert_keeps_payload_sorted_for_reused_line_ids() {
        let mut trie = BatchTrie::new();
        // A repeated line text re-interns to its earlier id, so the shared
        // node sees ids arrive out of order
        let ab = trie.intern_line("ab x");
        let b = trie.intern_line("b y");
        let ab_again = trie.intern_line("ab x");
        assert_eq!(ab, ab_again);

        trie.insert("b", ab);
        trie.insert("b", b);
        trie.insert("b", ab_again);

        let children = trie.children_sorted(ROOT);
        let (_, b_node) = children[0];
        assert_eq!(trie.terminal(b_node), &[ab, b]);
    }

    #[test]
    fn test_intern_line_collapses_duplicates() {
        let mut trie = BatchTrie::new();
        let a = trie.intern_line("same text");
        let b = trie.intern_line("same text");
        assert_eq!(a, b);
        assert_eq!(trie.lines().len(), 1);
    }

    #[test]
    fn test_empty_substring_not_stored() {
        let mut trie = BatchTrie::new();
        let line = trie.intern_line("x");
        trie.insert("", line);
        assert!(trie.terminal(ROOT).is_empty());
    }

    #[test]
    fn test_clear_resets() {
        let mut trie = BatchTrie::new();
        let line = trie.intern_line("cat");
        trie.insert("cat", line);
        trie.clear();
        assert!(trie.is_empty());
        assert!(trie.children_sorted(ROOT).is_empty());
    }
}
