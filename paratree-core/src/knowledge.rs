//! Wires the engine's three concrete payload kinds -- model, node and
//! solution -- into the framing layer's type-tag [`Registry`] (§4.2), so a
//! process can decode whichever of them arrives on the wire by tag lookup
//! alone, the way the rest of the knowledge registry is specified to work,
//! instead of the generic `D::decode`/`M::decode` calls a purely static
//! dispatch would allow.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use paratree_framing::{FramedBuffer, Knowledge, Prototype, Registry};

use crate::model::Model;
use crate::node::{Node, NodeDescription};
use crate::pool::Solution;

/// The type tag a model is registered and sent under.
pub const MODEL_TAG: &str = "model";
/// The type tag a node is registered and sent under.
pub const NODE_TAG: &str = "node";
/// The type tag a solution is registered and sent under.
pub const SOLUTION_TAG: &str = "solution";

struct ModelBox<M>(Arc<M>);

impl<M: Model + 'static> Knowledge for ModelBox<M> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ModelPrototype<M>(PhantomData<fn() -> M>);

impl<M: Model + 'static> Prototype for ModelPrototype<M> {
    fn decode(&self, buf: &mut FramedBuffer) -> Result<Box<dyn Knowledge>, paratree_framing::Error> {
        Ok(Box::new(ModelBox(Arc::new(M::decode(buf)?))))
    }
}

struct NodeBox<D>(Node<D>);

impl<D: NodeDescription + 'static> Knowledge for NodeBox<D> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct NodePrototype<D>(PhantomData<fn() -> D>);

impl<D: NodeDescription + 'static> Prototype for NodePrototype<D> {
    fn decode(&self, buf: &mut FramedBuffer) -> Result<Box<dyn Knowledge>, paratree_framing::Error> {
        Ok(Box::new(NodeBox(Node::<D>::decode(buf)?)))
    }
}

struct SolutionBox(Solution);

impl Knowledge for SolutionBox {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SolutionPrototype;

impl Prototype for SolutionPrototype {
    fn decode(&self, buf: &mut FramedBuffer) -> Result<Box<dyn Knowledge>, paratree_framing::Error> {
        Ok(Box::new(SolutionBox(Solution::decode(buf)?)))
    }
}

/// Registers prototypes for the model, node and solution kinds under
/// their well-known tags, per §4.7 step 1 ("register concrete kinds for
/// model/node/solution in the knowledge registry"). Must run before any
/// receive.
pub fn register_default_knowledge<D, M>(registry: &mut Registry)
where
    D: NodeDescription + 'static,
    M: Model + 'static,
{
    registry.register(MODEL_TAG, Box::new(ModelPrototype::<M>(PhantomData)));
    registry.register(NODE_TAG, Box::new(NodePrototype::<D>(PhantomData)));
    registry.register(SOLUTION_TAG, Box::new(SolutionPrototype));
}

/// Decodes a model out of a framed buffer via the registry, downcasting
/// back to the concrete kind. Fails with [`paratree_framing::Error::UnknownType`]
/// if `register_default_knowledge::<D, M>` was never called for this
/// registry.
pub fn decode_model<M: Model + 'static>(
    registry: &Registry,
    buf: &mut FramedBuffer,
) -> Result<Arc<M>, paratree_framing::Error> {
    let decoded = registry.decode(buf)?;
    let model_box = decoded
        .as_any()
        .downcast_ref::<ModelBox<M>>()
        .expect("registry tag 'model' always decodes to a ModelBox<M>");
    Ok(Arc::clone(&model_box.0))
}

/// Decodes a node out of a framed buffer via the registry.
pub fn decode_node<D: NodeDescription + 'static>(
    registry: &Registry,
    buf: &mut FramedBuffer,
) -> Result<Node<D>, paratree_framing::Error> {
    let decoded = registry.decode(buf)?;
    let boxed = decoded
        .as_any()
        .downcast_ref::<NodeBox<D>>()
        .expect("registry tag 'node' always decodes to a NodeBox<D>");
    Ok(boxed.0.clone())
}

/// Decodes a solution out of a framed buffer via the registry.
pub fn decode_solution(
    registry: &Registry,
    buf: &mut FramedBuffer,
) -> Result<Solution, paratree_framing::Error> {
    let decoded = registry.decode(buf)?;
    let boxed = decoded
        .as_any()
        .downcast_ref::<SolutionBox>()
        .expect("registry tag 'solution' always decodes to a SolutionBox");
    Ok(boxed.0.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Status;

    #[derive(Clone)]
    struct Bound(i64);

    impl NodeDescription for Bound {
        fn encode(&self, buf: &mut FramedBuffer) {
            buf.write(self.0);
        }
        fn decode(buf: &mut FramedBuffer) -> Result<Self, paratree_framing::Error> {
            Ok(Bound(buf.read::<i64>()?))
        }
    }

    struct ToyModel(i64);

    impl Model for ToyModel {
        fn encode(&self, buf: &mut FramedBuffer) {
            buf.write(self.0);
        }
        fn decode(buf: &mut FramedBuffer) -> Result<Self, paratree_framing::Error> {
            Ok(ToyModel(buf.read::<i64>()?))
        }
    }

    #[test]
    fn round_trips_a_model_through_the_registry() {
        let mut registry = Registry::new();
        register_default_knowledge::<Bound, ToyModel>(&mut registry);

        let mut buf = FramedBuffer::new(MODEL_TAG);
        ToyModel(9).encode(&mut buf);
        buf.rewind();

        let model = decode_model::<ToyModel>(&registry, &mut buf).unwrap();
        assert_eq!(model.0, 9);
    }

    #[test]
    fn round_trips_a_node_through_the_registry() {
        let mut registry = Registry::new();
        register_default_knowledge::<Bound, ToyModel>(&mut registry);

        let mut node = Node::new_root(Bound(3), 1.5);
        node.set_status(Status::Pregnant);
        let mut buf = FramedBuffer::new(NODE_TAG);
        node.encode(&mut buf);
        buf.rewind();

        let decoded = decode_node::<Bound>(&registry, &mut buf).unwrap();
        assert_eq!(decoded.description().0, 3);
        assert_eq!(decoded.status(), Status::Pregnant);
    }

    #[test]
    fn round_trips_a_solution_through_the_registry() {
        let mut registry = Registry::new();
        register_default_knowledge::<Bound, ToyModel>(&mut registry);

        let mut buf = FramedBuffer::new(SOLUTION_TAG);
        Solution::new(vec![1.0, 2.0], 3.0).encode(&mut buf);
        buf.rewind();

        let decoded = decode_solution(&registry, &mut buf).unwrap();
        assert_eq!(decoded.objective(), 3.0);
    }
}
