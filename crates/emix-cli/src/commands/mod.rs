pub mod run;
pub mod solver;
