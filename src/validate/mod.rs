pub mod forms;
pub mod validator;
