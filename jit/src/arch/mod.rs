pub mod arm32;
