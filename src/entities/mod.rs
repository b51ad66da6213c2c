pub mod commerce;
pub mod content;
pub mod factory;
pub mod password_reset_token;
pub mod soft_delete;
pub mod taxonomy;
pub mod user;
pub mod work_experience;
pub mod worker;
