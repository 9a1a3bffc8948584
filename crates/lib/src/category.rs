use crate::{CategoryId, CategoryNode, Flow, TenantId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    #[error("Category {0} was not found")]
    UnknownCategory(CategoryId),
    #[error("Category {category} walks back into {revisited} on its way to a root")]
    CyclicCategoryTree {
        category: CategoryId,
        revisited: CategoryId,
    },
    #[error("Category {category} references missing parent {parent}")]
    MissingParent {
        category: CategoryId,
        parent: CategoryId,
    },
    #[error("Category {0} appears more than once")]
    DuplicateCategory(CategoryId),
    #[error("Root category {root} has no flow hint and its name matches no vocabulary term")]
    UnclassifiedCategory { root: CategoryId },
    #[error("Root category {root} matches both inflow and outflow terms")]
    AmbiguousClassification { root: CategoryId },
}

/// Name fragments used to classify roots that carry no explicit hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    inflow: Vec<String>,
    outflow: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, O, S>(inflow: I, outflow: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            inflow: inflow.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
            outflow: outflow.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    /// Hints only, every unhinted root is rejected.
    pub fn empty() -> Self {
        Self {
            inflow: Vec::new(),
            outflow: Vec::new(),
        }
    }

    fn classify(&self, root: &CategoryNode) -> Result<Flow, CategoryError> {
        let name = root.name.to_lowercase();
        let inflow = self.inflow.iter().any(|term| name.contains(term.as_str()));
        let outflow = self.outflow.iter().any(|term| name.contains(term.as_str()));
        match (inflow, outflow) {
            (true, false) => Ok(Flow::Inflow),
            (false, true) => Ok(Flow::Outflow),
            (true, true) => Err(CategoryError::AmbiguousClassification { root: root.id }),
            (false, false) => Err(CategoryError::UnclassifiedCategory { root: root.id }),
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(
            ["income", "contribution", "ingreso", "aporte"],
            ["expense", "withdrawal", "egreso", "retiro"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub sign: Flow,
    /// Leaf first, root last.
    pub ancestor_chain: Vec<CategoryId>,
}

/// Arena of the categories visible to one tenant.
///
/// Nodes are addressed by their position in `nodes`; parent links are kept as ids
/// and looked up on every walk so a dangling parent is reported at resolution time
/// instead of poisoning the whole tree.
#[derive(Debug, Clone)]
pub struct CategoryTree {
    tenant: TenantId,
    nodes: Vec<CategoryNode>,
    index: HashMap<CategoryId, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    vocabulary: Vocabulary,
}

impl CategoryTree {
    /// Builds the tree seen by `tenant`: system nodes plus the tenant's own.
    /// Nodes owned by other tenants are dropped.
    pub fn build<I>(tenant: TenantId, nodes: I) -> Result<Self, CategoryError>
    where
        I: IntoIterator<Item = CategoryNode>,
    {
        let nodes = nodes
            .into_iter()
            .filter(|node| node.tenant_id.map_or(true, |owner| owner == tenant))
            .collect::<Vec<_>>();

        let mut index = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if index.insert(node.id, idx).is_some() {
                return Err(CategoryError::DuplicateCategory(node.id));
            }
        }

        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            match node.parent_id.and_then(|parent| index.get(&parent)) {
                Some(&parent) => children[parent].push(idx),
                None if node.parent_id.is_none() => roots.push(idx),
                None => {}
            }
        }

        Ok(Self {
            tenant,
            nodes,
            index,
            children,
            roots,
            vocabulary: Vocabulary::default(),
        })
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.index.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn roots(&self) -> impl Iterator<Item = &CategoryNode> {
        self.roots.iter().map(|&idx| &self.nodes[idx])
    }

    pub fn children(&self, id: CategoryId) -> Result<Vec<&CategoryNode>, CategoryError> {
        let idx = self.position(id)?;
        Ok(self.children[idx].iter().map(|&c| &self.nodes[c]).collect())
    }

    /// Every category below `id`, depth first, not including `id` itself.
    pub fn descendants(&self, id: CategoryId) -> Result<Vec<CategoryId>, CategoryError> {
        let start = self.position(id)?;
        let mut seen = vec![false; self.nodes.len()];
        seen[start] = true;

        let mut out = Vec::new();
        let mut stack = self.children[start].iter().rev().copied().collect::<Vec<_>>();
        while let Some(idx) = stack.pop() {
            if seen[idx] {
                return Err(CategoryError::CyclicCategoryTree {
                    category: id,
                    revisited: self.nodes[idx].id,
                });
            }
            seen[idx] = true;
            out.push(self.nodes[idx].id);
            stack.extend(self.children[idx].iter().rev());
        }

        Ok(out)
    }

    /// Walks from `id` up to its root and classifies the root.
    pub fn resolve(&self, id: CategoryId) -> Result<Resolution, CategoryError> {
        let mut idx = self.position(id)?;
        let mut seen = vec![false; self.nodes.len()];
        let mut ancestor_chain = Vec::new();

        loop {
            let node = &self.nodes[idx];
            if seen[idx] {
                return Err(CategoryError::CyclicCategoryTree {
                    category: id,
                    revisited: node.id,
                });
            }
            seen[idx] = true;
            ancestor_chain.push(node.id);

            match node.parent_id {
                None => break,
                Some(parent) => {
                    idx = *self
                        .index
                        .get(&parent)
                        .ok_or(CategoryError::MissingParent {
                            category: node.id,
                            parent,
                        })?;
                }
            }
        }

        let root = &self.nodes[idx];
        let sign = match root.classification_hint {
            Some(flow) => flow,
            None => self.vocabulary.classify(root)?,
        };

        Ok(Resolution {
            sign,
            ancestor_chain,
        })
    }

    fn position(&self, id: CategoryId) -> Result<usize, CategoryError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(CategoryError::UnknownCategory(id))
    }
}

pub fn resolve_category_sign(
    tree: &CategoryTree,
    category_id: CategoryId,
) -> Result<Resolution, CategoryError> {
    tree.resolve(category_id)
}
