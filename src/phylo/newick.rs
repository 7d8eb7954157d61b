use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};

use crate::error::{PlotError, Result};

pub type NodeId = phylotree::tree::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: Option<String>,
    pub length: Option<f64>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    fn from_phylo(node: &PhyloNode) -> Self {
        TreeNode {
            name: node.name.as_deref().and_then(clean_name),
            length: node.parent_edge,
            children: node.children.clone(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Strip Newick quoting; unquoted underscores read as spaces.
fn clean_name(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let name = match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => raw.replace('_', " "),
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Rooted tree stored as an arena; children keep their file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
    pub root: NodeId,
}

impl Tree {
    /// Parse a single `;`-terminated Newick tree.
    pub fn from_newick(text: &str) -> Result<Tree> {
        let text = text.trim();
        if !text.ends_with(';') {
            return Err(PlotError::InvalidInput("newick: tree must end with ';'".to_string()));
        }
        let phylo = PhyloTree::from_newick(text)
            .map_err(|err| PlotError::InvalidInput(format!("newick: {}", err)))?;
        let root = phylo
            .get_root()
            .map_err(|err| PlotError::InvalidInput(format!("newick: {}", err)))?;
        let nodes = (0..phylo.size())
            .map(|idx| {
                phylo
                    .get(&idx)
                    .map(TreeNode::from_phylo)
                    .map_err(|err| PlotError::InvalidInput(format!("newick: node {}: {}", idx, err)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Tree { nodes, root })
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    /// Tips in depth-first, left-to-right order.
    pub fn terminals(&self) -> Vec<NodeId> {
        let mut tips = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() {
                tips.push(id);
            }
            stack.extend(node.children.iter().rev());
        }
        tips
    }

    pub fn count_terminals(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &Tree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree.node(id).name.clone().unwrap_or_default()).collect()
    }

    #[test]
    fn parses_lengths_and_internal_labels() {
        let tree = Tree::from_newick("((A:0.1,B:0.2)ab:0.3,C:0.5)root;").unwrap();
        assert_eq!(names(&tree, &tree.terminals()), vec!["A", "B", "C"]);
        let root = tree.node(tree.root);
        assert_eq!(root.name.as_deref(), Some("root"));
        assert_eq!(root.children.len(), 2);
        let ab = tree.node(root.children[0]);
        assert_eq!(ab.name.as_deref(), Some("ab"));
        assert_eq!(ab.length, Some(0.3));
        assert_eq!(tree.count_terminals(), 3);
    }

    #[test]
    fn underscores_and_trailing_newline() {
        let tree = Tree::from_newick("(Genus_species:1,B:2);\n").unwrap();
        assert_eq!(names(&tree, &tree.terminals()), vec!["Genus species", "B"]);
        assert_eq!(tree.node(tree.terminals()[1]).length, Some(2.0));
    }

    #[test]
    fn quoted_names_are_unwrapped() {
        assert_eq!(clean_name("'it''s'"), Some("it's".to_string()));
        assert_eq!(clean_name("'a_b'"), Some("a_b".to_string()));
        assert_eq!(clean_name(""), None);
    }

    #[test]
    fn rejects_unterminated_input() {
        assert!(matches!(Tree::from_newick(""), Err(PlotError::InvalidInput(_))));
        assert!(matches!(Tree::from_newick("(A,B)"), Err(PlotError::InvalidInput(_))));
    }
}
