pub mod issue;
pub mod operation;
pub mod work_item;
