pub mod naming;
pub mod primitive;
