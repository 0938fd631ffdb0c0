pub mod annotations;
pub mod info;
pub mod montages;
pub mod window;
