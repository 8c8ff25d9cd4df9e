pub mod controller;
pub mod form_model;
pub mod outcome;
