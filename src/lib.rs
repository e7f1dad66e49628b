pub mod config;
pub mod defaults;
pub mod location;
pub mod match_type;
pub mod progress;
pub mod remediator;
pub mod replacement;
pub mod rules;
pub mod scanner;
pub mod source_unit;
