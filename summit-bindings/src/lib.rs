//! Platform service bindings for Summit
//!
//! Hosting platforms hand an application its backing-service credentials as
//! a JSON blob (`VCAP_SERVICES`). This crate parses that blob into a
//! [`ServiceBindingCatalog`] and selects exactly one [`ServiceBinding`] from
//! it, either by name or by a compatibility predicate.
//!
//! Selection never guesses: a predicate matching several bindings fails with
//! [`BindingError::AmbiguousBinding`] and the caller must name the binding.
//!
//! ```rust,ignore
//! use summit_bindings::*;
//! use std::sync::Arc;
//!
//! let resolver = BindingResolver::new(Arc::new(EnvCredentialsSource), HostEnvironment::Production);
//! let selection = BindingSelection::name_or(None, has_tag("eureka"));
//!
//! if let Some(binding) = resolver.resolve(&selection)? {
//!     println!("registry at {:?}", binding.credential("uri"));
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod resolver;
pub mod select;
pub mod source;

pub use catalog::{ServiceBinding, ServiceBindingCatalog};
pub use error::{BindingError, Result};
pub use resolver::{BindingResolver, BindingSelection};
pub use select::{has_tag, select_by_name, select_by_predicate};
pub use source::{
    CredentialsSource, EnvCredentialsSource, HostEnvironment, StaticCredentialsSource,
};
