//! Secure cart integration for the stocklock reservation system
//!
//! Wraps every cart mutation in the matching reservation transition:
//! add acquires before mutating, update revalidates or re-acquires,
//! remove always releases, and checkout runs cart-wide validation
//! followed by best-effort confirm-all or release-all.

pub mod backend;
pub mod integration;

pub use backend::{CartBackend, CartError, InMemoryCart};
pub use integration::SecureCart;
