pub mod compensation;
pub mod project;
pub mod returns;
pub mod risk;
