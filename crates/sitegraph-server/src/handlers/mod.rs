pub mod entities;
pub mod images;
pub mod users;
