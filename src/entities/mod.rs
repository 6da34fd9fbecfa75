//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each persisted collection of the storefront maps to one table here.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cart;
pub mod cart_item;
pub mod day_program;
pub mod exercise;
pub mod order;
pub mod order_item;
pub mod plan;
pub mod user;

// Re-export specific types to avoid conflicts
pub use cart::{Column as CartColumn, Entity as Cart, Model as CartModel};
pub use cart_item::{Column as CartItemColumn, Entity as CartItem, Model as CartItemModel};
pub use day_program::{
    Column as DayProgramColumn, Entity as DayProgram, Model as DayProgramModel,
};
pub use exercise::{Column as ExerciseColumn, Entity as Exercise, Model as ExerciseModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use plan::{Column as PlanColumn, Entity as Plan, Model as PlanModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
