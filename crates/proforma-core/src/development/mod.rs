pub mod costs;
pub mod financing;
