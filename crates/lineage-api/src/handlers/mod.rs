pub mod relationships;
pub mod ws;
