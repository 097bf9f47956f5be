//! Repository implementations.

pub mod church;
pub mod operator;

pub use church::ChurchRepository;
pub use operator::OperatorRepository;
