pub mod attention;
pub mod entity_store;
pub mod reconciler;
pub mod subscribers;

pub use attention::AttentionLedger;
pub use entity_store::EntityStore;
pub use reconciler::Reconciler;
pub use subscribers::{SubscriberRegistry, SubscriptionId};
