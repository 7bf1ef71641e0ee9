pub mod ai;
pub mod shapes;
