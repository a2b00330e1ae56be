mod common;
mod thresholds;
mod visibility;
