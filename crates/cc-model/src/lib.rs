//! Continuous Conformance data model
//!
//! Pure data shared by the gateway and the engine:
//! - the measure catalogue and the per-project settings document
//! - tag naming rules and the `;`-delimited tag encoding
//! - work-item records, link-query rows and work-item types
//! - add-only JSON-Patch documents and typed WIQL link queries
//!
//! Nothing here performs I/O.

#![warn(unreachable_pub)]

pub mod defaults;
pub mod error;
pub mod measure;
pub mod patch;
pub mod settings;
pub mod tags;
pub mod wiql;
pub mod work_item;

pub use error::{ValidationError, TAG_NAMING_RESTRICTIONS_URL};
pub use measure::{validate_new_name, Measure};
pub use patch::{PatchOperation, WorkItemDraft};
pub use settings::{Settings, OVERWRITE_ETAG, SETTINGS_DOCUMENT_ID};
pub use tags::{is_valid_measure_name, is_valid_tag};
pub use wiql::LinkQuery;
pub use work_item::{
    IdentityRef, StateCategory, WorkItem, WorkItemId, WorkItemLink, WorkItemReference,
    WorkItemRelation, WorkItemType,
};
