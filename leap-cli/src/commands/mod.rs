pub mod h2;
pub mod related;
