use paratree_framing::{Error as FramingError, FramedBuffer};

/// A search node's identifier: its index within the owning subtree.
///
/// Monotonically increasing within a subtree; unique there. Global
/// uniqueness across subtrees (e.g. across worker processes) is not
/// required.
pub type NodeId = u64;

/// A search node's life-cycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Freshly created, not yet processed.
    Candidate,
    /// Processed at least once, still viable, not yet decided to branch.
    Evaluated,
    /// Processing decided this node must be branched next.
    Pregnant,
    /// Branched into children; the node itself keeps no further work.
    Branched,
    /// Cannot yield a better solution; safe to delete.
    Fathomed,
}

impl Status {
    fn as_u8(self) -> u8 {
        match self {
            Status::Candidate => 0,
            Status::Evaluated => 1,
            Status::Pregnant => 2,
            Status::Branched => 3,
            Status::Fathomed => 4,
        }
    }

    fn from_u8(tag: u8) -> Result<Status, FramingError> {
        Ok(match tag {
            0 => Status::Candidate,
            1 => Status::Evaluated,
            2 => Status::Pregnant,
            3 => Status::Branched,
            4 => Status::Fathomed,
            other => return Err(FramingError::SizeMismatch(other as i32)),
        })
    }
}

/// The capability contract a client's subproblem description must
/// implement so the engine can ship it between processes.
pub trait NodeDescription: Sized + Send + Sync + Clone {
    /// Appends this description's contents to `buf`.
    fn encode(&self, buf: &mut FramedBuffer);
    /// Reconstructs a description from `buf`, the inverse of [`Self::encode`].
    fn decode(buf: &mut FramedBuffer) -> Result<Self, FramingError>;
}

/// One child descriptor produced by `branch`:
/// a subproblem description, its initial status, and its quality.
pub struct ChildSpec<D> {
    /// The child's subproblem description.
    pub description: D,
    /// The child's initial status (must not be `branched`).
    pub status: Status,
    /// The child's quality, used as both its quality and initial priority.
    pub quality: f64,
}

impl<D> ChildSpec<D> {
    /// Convenience constructor.
    pub fn new(description: D, status: Status, quality: f64) -> Self {
        ChildSpec {
            description,
            status,
            quality,
        }
    }
}

/// The outcome of a single call to a client's `process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The call added (or improved) a solution in the solution pool.
    BetterSolutionFound,
    /// Nothing changed as far as the incumbent is concerned.
    NoChange,
}

/// The capability contract a client implements to drive the search:
/// evaluate a node in place, and split a pregnant one into children.
pub trait NodeLogic<D>: Send + Sync {
    /// Evaluates `node` in place, possibly improving `solutions` and
    /// transitioning `node`'s status (to `pregnant` if it should branch
    /// next, `fathomed` if it can be discarded, or left `evaluated` to be
    /// requeued for another look later).
    ///
    /// `is_root` is set for the subtree's own root; `ramp_up` is set while
    /// the search is still building up a working node count and client
    /// logic may want to relax pruning accordingly.
    fn process(
        &self,
        node: &mut Node<D>,
        is_root: bool,
        ramp_up: bool,
        solutions: &mut crate::pool::SolutionPool,
    ) -> Result<ProcessOutcome, crate::error::Error>;

    /// Splits a `pregnant` node into at least one child descriptor.
    fn branch(&self, node: &Node<D>) -> Result<Vec<ChildSpec<D>>, crate::error::Error>;
}

/// One vertex in the dynamically generated search tree.
#[derive(Debug, Clone)]
pub struct Node<D> {
    index: NodeId,
    depth: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    status: Status,
    quality: f64,
    priority: f64,
    active: bool,
    description: D,
}

impl<D> Node<D> {
    /// Builds a fresh, parentless root node at `quality`. Used both to
    /// seed a subtree's own root and by clients that need to materialize
    /// a node from nothing but a description (e.g. the search's very
    /// first root before it has been broadcast to anyone).
    pub fn new_root(description: D, quality: f64) -> Self {
        Node {
            index: 0,
            depth: 0,
            parent: None,
            children: Vec::new(),
            status: Status::Candidate,
            quality,
            priority: quality,
            active: false,
            description,
        }
    }

    pub(crate) fn new_child(
        index: NodeId,
        parent: NodeId,
        depth: u32,
        spec: ChildSpec<D>,
    ) -> Self {
        Node {
            index,
            depth,
            parent: Some(parent),
            children: Vec::new(),
            status: spec.status,
            quality: spec.quality,
            priority: spec.quality,
            active: false,
            description: spec.description,
        }
    }

    /// This node's index within its owning subtree.
    pub fn index(&self) -> NodeId {
        self.index
    }

    /// 0 at the root; parent's depth + 1 otherwise.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The parent's index, or `None` if this is a subtree's root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The currently attached children's indices.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// This node's current status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Sets this node's status. Exposed so a client's `process`/`branch`
    /// implementation can transition it.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// This node's quality (ordering key; lower is more desirable).
    pub fn quality(&self) -> f64 {
        self.quality
    }

    /// Updates this node's quality. By default also updates its priority,
    /// matching the default convention that priority tracks quality.
    pub fn set_quality(&mut self, quality: f64) {
        self.quality = quality;
        self.priority = quality;
    }

    /// This node's placement key in the node pool.
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Overrides this node's pool priority independently of its quality.
    pub fn set_priority(&mut self, priority: f64) {
        self.priority = priority;
    }

    /// Whether the executor currently holds this node for processing.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Read-only access to the client-owned subproblem description.
    pub fn description(&self) -> &D {
        &self.description
    }

    /// Mutable access, so `process` can update the description in place.
    pub fn description_mut(&mut self) -> &mut D {
        &mut self.description
    }

    /// Consumes a decoded or foreign node and re-mounts it as a fresh
    /// subtree root under `new_index`, dropping any parent/children links
    /// that only made sense in its subtree of origin.
    pub(crate) fn rekey_as_root(self, new_index: NodeId) -> Node<D> {
        Node {
            index: new_index,
            depth: 0,
            parent: None,
            children: Vec::new(),
            status: self.status,
            quality: self.quality,
            priority: self.priority,
            active: false,
            description: self.description,
        }
    }

    pub(crate) fn attach_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(crate) fn detach_child(&mut self, child: NodeId) {
        self.children.retain(|&id| id != child);
    }
}

impl<D: NodeDescription> Node<D> {
    /// Encodes this node's identity fields and its description.
    pub fn encode(&self, buf: &mut FramedBuffer) {
        buf.write(self.index);
        buf.write(self.depth);
        buf.write(self.parent.is_some());
        buf.write(self.parent.unwrap_or(0));
        buf.write(self.status.as_u8());
        buf.write(self.quality);
        buf.write(self.priority);
        self.description.encode(buf);
    }

    /// Reconstructs a node from a buffer written by [`Self::encode`].
    ///
    /// The returned node is detached (no children, parent index taken at
    /// face value) -- wiring it back into a subtree's arena is the
    /// caller's responsibility.
    pub fn decode(buf: &mut FramedBuffer) -> Result<Self, FramingError> {
        let index = buf.read::<u64>()?;
        let depth = buf.read::<u32>()?;
        let has_parent = buf.read::<bool>()?;
        let parent_raw = buf.read::<u64>()?;
        let status = Status::from_u8(buf.read::<u8>()?)?;
        let quality = buf.read::<f64>()?;
        let priority = buf.read::<f64>()?;
        let description = D::decode(buf)?;
        Ok(Node {
            index,
            depth,
            parent: if has_parent { Some(parent_raw) } else { None },
            children: Vec::new(),
            status,
            quality,
            priority,
            active: false,
            description,
        })
    }
}
