pub mod likelihood;
pub mod simplex;
pub mod solver;
