pub mod coordinates;
pub mod prices;
