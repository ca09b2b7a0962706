//! Domain entities and the handler trait seams.

pub mod item;
pub mod product;
pub mod services;

pub use item::{StatusCounts, WorkKind, WorkStatus};
pub use product::{CategoryLink, CategoryPage, FitmentRow, ProductLink, ProductRecord};
pub use services::{
    CatalogHandler, CategoryHandler, HandlerError, HandlerResult, ProductHandler,
};
