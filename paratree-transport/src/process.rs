/// A rank identifying one process in the transport's world: `0` is always
/// the hub, `1..world_size` are workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

impl ProcessId {
    /// The hub's rank, by convention always zero.
    pub const HUB: ProcessId = ProcessId(0);

    /// Whether this rank is the hub.
    pub fn is_hub(self) -> bool {
        self == ProcessId::HUB
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
