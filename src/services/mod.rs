pub mod locations;
pub mod scheduler;
pub mod sensor;
pub mod summarize;
