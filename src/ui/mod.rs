pub mod panels;
pub mod pick;
pub mod plot;
