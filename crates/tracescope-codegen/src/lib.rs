#![doc = include_str!("../README.md")]

//! Module synthesis for trace exploration.
//!
//! Everything in this crate is deterministic text assembly over the data
//! model: the registry issues names, the encoder renders trace states, and
//! the writer lays the blocks out in their fixed order. No expression is
//! ever evaluated and no trace value is ever reinterpreted here.

pub mod encoder;
pub mod registry;
pub mod writer;

pub use registry::{ExpressionRegistry, RegistryError};
pub use writer::{synthesize, ModuleWriter, SynthesisPhase};
