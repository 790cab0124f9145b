//! prompt
//!
//! Declarative prompt protocol.
//!
//! # Modules
//!
//! - [`field`] - One argument: type, default, rule, error, help text
//! - [`protocol`] - Ordered field-sets keyed by command verb
//! - [`resolver`] - Partition of a field-set against supplied flags
//!
//! # Data Flow
//!
//! ```text
//! PromptProtocol --get(verb)--> FieldSet
//!     --ArgumentResolver::partition--> ResolutionResult { explicit, silent, pending }
//!     --InteractiveInput::collect(pending)--> ValueSet
//!     --ResolutionResult::merge--> final ValueSet
//! ```

pub mod field;
pub mod protocol;
pub mod resolver;

pub use field::{Choices, ErrorMessage, FieldType, PromptField, RuleArg, ValidationRule};
pub use protocol::{FieldSet, PromptProtocol, ProtocolError};
pub use resolver::{ArgumentResolver, ResolutionResult, SuppliedFlags, ValueSet};
