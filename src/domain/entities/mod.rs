pub mod capacity;
pub mod membership;
pub mod payment_intent;
