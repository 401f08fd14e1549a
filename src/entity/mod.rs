pub mod categories;
pub mod products;
pub mod sales;

pub use categories::Entity as Categories;
pub use products::Entity as Products;
pub use sales::Entity as Sales;
