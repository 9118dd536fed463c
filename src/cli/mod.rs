pub mod company;
pub mod output;
