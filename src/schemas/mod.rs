//! Built-in pipeline config schema versions, oldest first
//!
//! Every version is frozen once released: a module may only gain an
//! `upgrade` into its successor. New shapes go into a new module which then
//! becomes [`latest`].

pub mod v1alpha1;
pub mod v1alpha2;
pub mod v1alpha3;
pub mod v1beta1;

pub use v1beta1 as latest;

use crate::registry::VersionEntry;

/// The built-in version table in release order
pub(crate) fn entries() -> Vec<VersionEntry> {
    vec![
        VersionEntry::new(v1alpha1::VERSION, v1alpha1::new_pipeline),
        VersionEntry::new(v1alpha2::VERSION, v1alpha2::new_pipeline),
        VersionEntry::new(v1alpha3::VERSION, v1alpha3::new_pipeline),
        VersionEntry::new(latest::VERSION, latest::new_pipeline),
    ]
}
