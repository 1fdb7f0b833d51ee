//! Domain stores
//!
//! Each store wraps an [`EntityStore`](crate::store::EntityStore) for its
//! entity and adds the endpoints the backend exposes beyond plain CRUD.
//! Every extra operation goes through
//! [`EntityStore::tracked`](crate::store::EntityStore::tracked), so loading
//! and error reporting behave identically.

pub mod users;
pub mod vacation_requests;
pub mod work_entries;

pub use users::UserStore;
pub use vacation_requests::VacationRequestStore;
pub use work_entries::WorkEntryStore;
