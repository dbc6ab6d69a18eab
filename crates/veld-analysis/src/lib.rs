//! Semantic analysis over bound trees: region data-flow queries, declaration
//! modifier resolution and diagnostic suppression.

pub mod bound;
pub mod flow;
pub mod modifiers;
pub mod suppression;

pub use bound::{Body, BodyBuilder, BoundRef, RegionSpan};
pub use flow::{DataFlowResult, DataFlowsInWalker, FlowState};
pub use modifiers::{
    Accessibility, DeclarationModifiers, adjust_for_interface_member, check_modifiers,
    effective_accessibility,
};
pub use suppression::{Compilation, CompilationBuilder, SuppressAttr, SuppressMessageInfo};
