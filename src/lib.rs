//! Client for the shortlink URL-shortening services.
//!
//! Every form (register, login, shorten, history) is driven by a
//! [`form::controller::SubmissionController`]: it validates the current
//! field values, hands a snapshot to a [`remote::remote_model::RemoteAction`],
//! and settles into a success or failure the view renders from.

pub mod cli;
pub mod form;
pub mod remote;
pub mod report;
pub mod session;
pub mod trace;
pub mod validate;
