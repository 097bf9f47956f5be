//! Entity definitions (database row mappings).

pub mod church;
pub mod operator;

pub use church::ChurchEntity;
pub use operator::OperatorEntity;
