pub mod positive_surprise;
