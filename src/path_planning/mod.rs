// Path Planning algorithms module

pub mod kinodynamic_rrt_star;

pub use kinodynamic_rrt_star::*;
