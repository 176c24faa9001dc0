//! Logview Core - log-section state machine
//!
//! Pure, synchronous half of the log view:
//! - Classifies execution statuses
//! - Builds log sections from an execution node
//! - Reduces actions into new state snapshots
//! - Searches open sections with stable match numbering
//!
//! # Example
//!
//! ```rust
//! use logview_core::prelude::*;
//!
//! let node = ExecutionNode::new(ExecutionStatus::Success)
//!     .with_task(TaskDescriptor::new(["Build"], ["key-1"]))
//!     .with_progress(UnitProgress::new("Build", ExecutionStatus::Success));
//!
//! let state = reduce(
//!     &LogViewState::new(),
//!     &Action::CreateSections(CreateSectionsPayload::new(node, "step-1")),
//! );
//! assert_eq!(state.section("key-1").unwrap().status, SectionStatus::Loading);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod actions;
pub mod builder;
pub mod node;
pub mod parse;
pub mod reducer;
pub mod sanitize;
pub mod search;
pub mod status;
pub mod types;
pub mod view;

// Re-exports for convenience
pub use actions::{Action, UpdateSectionData};
pub use builder::{create_sections, CreateSectionsPayload};
pub use node::{ExecutableResponse, ExecutionNode, TaskDescriptor, UnitProgress};
pub use parse::{parse_log_text, ParseError};
pub use reducer::reduce;
pub use status::{ExecutionStatus, SectionStatus};
pub use types::{
    DataSource, LineText, LogField, LogLine, LogViewState, SearchIndices, SearchState,
    SectionState, UnitKey,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the log view state
    pub use crate::actions::{Action, UpdateSectionData};
    pub use crate::builder::CreateSectionsPayload;
    pub use crate::node::{ExecutionNode, TaskDescriptor, UnitProgress};
    pub use crate::reducer::reduce;
    pub use crate::status::{ExecutionStatus, SectionStatus};
    pub use crate::types::{DataSource, LogLine, LogViewState, SectionState, UnitKey};
}
