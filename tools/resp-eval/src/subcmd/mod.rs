pub mod check;
pub mod compare;
pub mod dice;
pub mod displacement;
pub mod folder;
pub mod magnitude;
mod parsers;
