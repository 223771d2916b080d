//! Pure business rules for pricing, coupons, and the order lifecycle.
//! Everything here is synchronous and storage-free; the services layer is
//! responsible for loading records and persisting outcomes.

pub mod cancellation;
pub mod coupons;
pub mod pricing;
pub mod status;
