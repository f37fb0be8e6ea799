/*!

The public API of the library: the term algebra and its factory, the contracts the reasoner
consumes (`MemoryView`, `LanguageModel`, `EmbeddingLayer`), and the introspection event surface.

*/

pub mod events;
pub mod language_model;
pub mod memory;
pub mod operator;
pub mod term;
pub mod term_factory;

pub use events::{Event, EventBus, EventObserver};
pub use language_model::{EmbeddingLayer, LanguageModel, SimilarTerm};
pub use memory::{ConceptView, MemoryView, SimpleConcept, SimpleMemory};
pub use operator::{Operator, OperatorAttribute, OperatorAttributes};
pub use term::{MaybeTerm, Term, TermData, TermPtr};
pub use term_factory::TermFactory;

/// Name of the system atom that reflexive statements collapse to.
pub const TRUE_ATOM_NAME: &str = "True";
