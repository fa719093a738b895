mod model;
mod repository;

pub use model::{BillInstanceDB, BillInstanceReminderDB};
pub use repository::BillRepository;
