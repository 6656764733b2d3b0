pub mod client;
pub mod reconcile;

pub use client::{EntityHit, EntityProvider, KnowledgeBaseClient, PropertyHit};
pub use reconcile::{GraphStatementStore, Reconciler, StatementStore};
