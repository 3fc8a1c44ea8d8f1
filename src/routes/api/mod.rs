pub mod battles;
pub mod teams;
