pub mod fees;
pub mod quoter;

pub use fees::FeeDiscoverer;
pub use quoter::Quoter;
