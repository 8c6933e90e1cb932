pub mod conditions;
pub mod path;
pub mod visitor;
