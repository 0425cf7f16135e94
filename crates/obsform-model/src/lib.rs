//! Wire types shared by the form engine.
//!
//! - [`FormDefinition`] and [`Control`]: the declarative form, as authored in
//!   the form builder.
//! - [`Observation`]: a persisted or to-be-persisted clinical value. The same
//!   shape is read from storage and handed back for saving.
//! - [`Finding`]: a validation error or warning attached to a record.

mod concept;
mod error;
mod finding;
mod form;
mod observation;

pub use concept::Concept;
pub use concept::ConceptDatatype;
pub use error::ModelError;
pub use finding::Finding;
pub use finding::FindingType;
pub use form::Control;
pub use form::ControlType;
pub use form::FormDefinition;
pub use form::Label;
pub use form::Location;
pub use form::Properties;
pub use observation::is_empty_value;
pub use observation::Interpretation;
pub use observation::Observation;
