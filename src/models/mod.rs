pub mod battle;
pub mod team;
