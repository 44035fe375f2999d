pub mod clock;
pub mod curves;
pub mod smooth;
pub mod timebase;
