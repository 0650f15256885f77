//! Database query functions organized by table.

pub mod nonces;
pub mod payouts;
pub mod snapshots;
pub mod transactions;
