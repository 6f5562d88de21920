pub mod body;
pub mod forces;
pub mod frame;
pub mod kane;
pub mod msd;
pub mod newton;
pub mod point;
