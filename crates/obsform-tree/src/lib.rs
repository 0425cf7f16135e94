//! The control-record tree.
//!
//! A [`Record`] is one instance of a form control. [`TreeBuilder`] turns a
//! form definition and its stored observations into a tree of records, the
//! functions in [`manager`] query and edit that tree by form-field path, and
//! the functions in [`view`] derive what a renderer, a validator and storage
//! need from it.
//!
//! Trees are persistent values. Editing returns a new root and leaves the old
//! one intact, sharing every subtree the edit did not touch:
//!
//! ```
//! # use obsform_model::{Concept, ConceptDatatype, Control, ControlType, FormDefinition};
//! # use obsform_path::FormFieldPath;
//! # use obsform_tree::{manager, view, TreeBuilder};
//! # use serde_json::json;
//! let form = FormDefinition {
//!     name: "Vitals".to_string(),
//!     version: "1".to_string(),
//!     uuid: None,
//!     controls: vec![Control::new("1", ControlType::ObsControl)
//!         .with_concept(Concept::new("c-pulse", "Pulse", ConceptDatatype::Numeric))],
//! };
//! let root = TreeBuilder::default().build(&form, &[])?;
//!
//! let pulse = FormFieldPath::parse("Vitals.1/1-0")?;
//! let edited = manager::update_value(&root, &pulse, json!(72))?;
//!
//! assert_eq!(view::to_observation_list(&edited)?.len(), 1);
//! assert!(view::to_observation_list(&root)?.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod error;
pub mod manager;
mod mapper;
mod record;
pub mod snapshot;
pub mod validation;
pub mod view;

pub use builder::BuildOptions;
pub use builder::TreeBuilder;
pub use error::TreeError;
pub use mapper::DataSource;
pub use mapper::ValueMapper;
pub use record::Record;
pub use validation::Validator;
