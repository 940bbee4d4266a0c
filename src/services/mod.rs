pub mod checkout;
pub mod notifier;
pub mod payments;
pub mod pricing;
pub mod verification;
