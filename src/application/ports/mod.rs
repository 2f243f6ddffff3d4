//! Application ports
//!
//! Outbound contracts for the collaborators the reconcilers call
//! (wallet ledger, user push, operator broadcast).

pub mod outbound;

pub use outbound::{CreditOutcome, GatewayError, OperatorNotifier, UserNotifier, WalletLedger};
