pub mod accountability;
