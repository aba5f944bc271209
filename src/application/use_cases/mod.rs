pub mod admission_ledger;
pub mod checkout;
pub mod manual_admission;
pub mod payment_callback;
