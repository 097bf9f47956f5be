//! Domain models for ChurchDonate.

pub mod auth;
pub mod church;
pub mod operator;

pub use church::{BankDetails, Church, VisitSource};
pub use operator::{Operator, OperatorStatus};
