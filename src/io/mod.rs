/// CSV export of energy samples.
pub mod export;
