pub mod entity;
pub mod frame;
pub mod lexeme;
pub mod profile;
