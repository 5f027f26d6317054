pub mod audit_logs;
pub mod carousel_items;
pub mod cart_items;
pub mod categories;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use carousel_items::Entity as CarouselItems;
pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use favorites::Entity as Favorites;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
