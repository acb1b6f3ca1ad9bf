mod awards;
mod common;
