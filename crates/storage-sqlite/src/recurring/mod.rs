mod model;
mod repository;

pub use model::{NewRecurringExpenseDB, RecurringExpenseDB};
pub use repository::RecurringRepository;
