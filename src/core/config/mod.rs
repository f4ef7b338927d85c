pub mod data;
pub mod io;
pub mod keys;
pub mod printing;
pub mod resolve;


pub use data::Config;
pub use io::ConfigError;
pub use resolve::Settings;
