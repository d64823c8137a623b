pub mod approval;
pub mod product;
