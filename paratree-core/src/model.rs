use paratree_framing::{Error as FramingError, FramedBuffer};

/// The capability contract a client's problem instance implements: an
/// opaque, framed payload broadcast once at startup and held read-only by
/// every process for the rest of the search.
pub trait Model: Send + Sync + Sized {
    /// Appends this model's contents to `buf`.
    fn encode(&self, buf: &mut FramedBuffer);
    /// Reconstructs a model from `buf`, the inverse of [`Self::encode`].
    fn decode(buf: &mut FramedBuffer) -> Result<Self, FramingError>;
}
