pub mod health;
pub mod model;
pub mod run;
pub mod settings;
