pub mod chart;
pub mod prices;
