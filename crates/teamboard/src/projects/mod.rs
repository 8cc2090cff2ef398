pub mod applications;
pub mod forms;
