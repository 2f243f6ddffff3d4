//! Database entities module

pub mod charger;
pub mod dealer_station;
pub mod receipt;
pub mod session;
pub mod slot;
pub mod slot_booking;
pub mod station;
pub mod wallet_credit;

pub use charger::Entity as Charger;
pub use dealer_station::Entity as DealerStation;
pub use receipt::Entity as Receipt;
pub use session::Entity as Session;
pub use slot::Entity as Slot;
pub use slot_booking::Entity as SlotBooking;
pub use station::Entity as Station;
pub use wallet_credit::Entity as WalletCredit;
