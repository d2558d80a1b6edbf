pub(crate) mod annotation;
pub(crate) mod builder;
pub(crate) mod literal;
pub(crate) mod node;
pub(crate) mod tree;

pub use annotation::AnnotationEntry;
pub use builder::TreeBuilder;
pub use literal::{
    BigDecimal, DefaultLiteralTranslator, LiteralTranslator, LiteralType,
    LiteralValue,
};
pub use node::{Edge, EdgeId, Node, NodeId};
pub use tree::{Tree, TreeError};
