pub mod bus;
pub mod core;
pub mod dmac;
pub mod gs;
pub mod intc;
pub mod peripheral;
pub mod rdram;
pub mod register_file;
pub mod scheduler;
pub mod sif;
pub mod system;
pub mod timer;
